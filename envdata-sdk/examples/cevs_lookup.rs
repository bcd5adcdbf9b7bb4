//! CEVS Lookup Example
//!
//! This example demonstrates how to look up a company's CEVS score and how
//! to present a failed call to a user.
//!
//! To run this example:
//! ```
//! ENVDATA_API_URL=https://api.example.com ENVDATA_API_KEY=your_key cargo run --example cevs_lookup -- Acme US
//! ```

use envdata_sdk::{client_from_env, init_tracing, TracingConfig};

#[tokio::main]
async fn main() {
    if let Err(e) = init_tracing(&TracingConfig::default()) {
        eprintln!("{}", e);
    }

    let mut args = std::env::args().skip(1);
    let company = args.next().unwrap_or_else(|| "Acme".to_string());
    let country = args.next();

    let client = match client_from_env() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    match client.cevs_score(&company, country.as_deref()).await {
        Ok(score) => {
            println!("Company: {}", score.company);
            match score.cevs_score {
                Some(value) => println!("CEVS score: {:.1}", value),
                None => println!("CEVS score: not available"),
            }
        }
        Err(e) => {
            let result = client.error_result(&e);
            eprintln!("{} ({})", result.message, result.code);
            if result.can_retry {
                eprintln!("You can try again in a moment.");
            }
        }
    }

    if let Err(e) = client.context().shutdown() {
        eprintln!("Could not save logs: {}", e);
    }
}
