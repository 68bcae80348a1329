use anyhow::{Context, Result, anyhow};
use autoin::Orchestrator;
use autoin_daemon::config::{Config, config_path};
use autoin_daemon::keeper::{Account, Keeper, RunExit};
use autoin_daemon::logging;
use autoin_daemon::sink::CookieFileSink;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
	logging::init_logging();

	if let Err(err) = run().await {
		error!(target = "autoin", error = %format_args!("{err:#}"), "daemon failed");
		std::process::exit(1);
	}
}

async fn run() -> Result<()> {
	let path = config_path().ok_or_else(|| anyhow!("no config directory; set AUTOIN_CONFIG"))?;
	let config = Config::load(&path)?;
	let terms = config.term_contexts()?;
	info!(target = "autoin", config = %path.display(), terms = terms.len(), "configuration loaded");

	let browser = autoin_runtime::launch(&config.browser.launch_options())
		.await
		.context("failed to launch browser")?;
	let orchestrator = Orchestrator::new(browser, config.portal.clone()).with_timings(config.timings.timings());
	let sink = CookieFileSink::new(config.output.dir.clone());
	let account = Account {
		credentials: config.credentials.clone(),
		preference: config.login.clone(),
		auto_push: config.auto_push,
	};

	let mut keeper = Keeper::new(orchestrator, sink, account, terms, config.refresh.policy());
	let exit = keeper
		.run(async {
			if let Err(err) = tokio::signal::ctrl_c().await {
				warn!(target = "autoin", error = %err, "failed to listen for ctrl-c");
				std::future::pending::<()>().await;
			}
		})
		.await;

	keeper.into_orchestrator().into_browser().close().await;
	match exit {
		RunExit::Shutdown => Ok(()),
		RunExit::AllRetired => Err(anyhow!("every session was retired")),
	}
}
