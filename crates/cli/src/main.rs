use graphene_cli::{cli, commands, logging};

#[tokio::main]
async fn main() {
	let cli = cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = commands::dispatch(cli).await {
		eprintln!("error: {err:#}");
		std::process::exit(1);
	}
}
