use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = mailtriage::cli::Cli::parse();

    if let Err(err) = mailtriage::run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
