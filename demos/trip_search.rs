//! Trip search against a running map backend.
//!
//! Run with: cargo run --example trip_search --features http -- <from> <to> [base_url]

use trip_matcher::{ClientConfig, MapClient, MapSession, MatchConfig, SearchController, SearchResolution};

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <from> <to> [base_url]", args[0]);
        std::process::exit(1);
    }

    let mut config = ClientConfig::default();
    if let Some(base_url) = args.get(3) {
        config.base_url = base_url.clone();
    }

    let client = match MapClient::new(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            std::process::exit(1);
        }
    };
    let session = match MapSession::new(MatchConfig::default()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Invalid match config: {}", e);
            std::process::exit(1);
        }
    };
    let controller = SearchController::new(client, session);

    match controller.load_initial().await {
        Ok((options, _)) => println!("Loaded situations ({} counties)", options.counties.len()),
        Err(e) => eprintln!("Failed to load situations: {}", e),
    }

    match controller.search(&args[1], &args[2]).await {
        Ok(SearchResolution::Applied(outcome)) => {
            println!("{} situations along the trip", outcome.matches().len());
            for m in outcome.matches() {
                println!("   {:?} ({:.1}m)", m.reference_coordinate, m.distance_meters);
            }
        }
        Ok(SearchResolution::NoRoute) => println!("Could not find a route"),
        Ok(SearchResolution::Superseded) => println!("Search superseded"),
        Err(e) => eprintln!("Error fetching trip: {}", e),
    }
}
