use std::error::Error;
use std::sync::Arc;

use futures::future::FutureExt;
use log::{info, initialize_logger};
use tokio::sync::mpsc;
use warp::Filter;

use reelgraph::config::{get_variable, get_variable_or, StorageKind};
use reelgraph::db::{Db, MemoryDb, PgDb};
use reelgraph::environment::{Config, Environment};
use reelgraph::routes;
use reelgraph::routes::admin::TerminationFunctionWrapper;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let main_port: u16 = get_variable("BACKEND_PORT").parse()?;
    let admin_port: u16 = get_variable("BACKEND_ADMIN_PORT").parse()?;

    info!(logger, "Starting..."; "main_port" => main_port, "admin_port" => admin_port);
    let logger = Arc::new(logger);

    let storage: StorageKind = get_variable_or("BACKEND_STORAGE", "memory").parse()?;

    let db: Arc<dyn Db> = match storage {
        StorageKind::Memory => {
            info!(logger, "Using in-memory storage");
            Arc::new(MemoryDb::new())
        }
        StorageKind::Postgres => {
            info!(logger, "Creating database pool...");
            let connection_string = get_variable("BACKEND_DB_CONNECTION_STRING");
            let pool = sqlx::PgPool::connect(&connection_string).await?;
            Arc::new(PgDb::new(pool))
        }
    };

    let config = Config::new(get_variable_or("BACKEND_POPULAR_COUNT", "10").parse()?)?;
    let environment = Environment::new(logger.clone(), db, config);

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate: TerminationFunctionWrapper = Arc::new(move || {
        let termination_sender = termination_sender.clone();

        async move {
            // a full channel means shutdown is already under way
            let _ = termination_sender.try_send(());
        }
        .boxed()
    });

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate().await;
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();

        let (_, main_server) = warp::serve(routes::make_api(environment))
            .bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async {
                should_terminate.await;
            });

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();

        let routes = routes::admin::make_healthz_route().or(
            routes::admin::make_termination_route(logger.clone(), terminate),
        );

        let (_, admin_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), async {
                should_terminate.await;
            });

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}
