use clap::Parser;
use tagshelf_lib::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = tagshelf_lib::run(cli).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
