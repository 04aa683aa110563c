//! The connection retry loop.
//!
//! ```text
//! resolve port ──► Connecting ──ok──► Connected
//!                     │ err
//!                     ▼
//!              (launch unless no_launch)
//!                     ▼
//!                  Waiting ──budget left──► Connecting
//!                     │ budget spent
//!                     ▼
//!                 Exhausted
//! ```

use crate::connect::channel::Channel;
use crate::connect::policy::build_backoff;
use crate::discovery::port::resolve_port;
use crate::error::connect::ConnectError;
use crate::error::establish::EstablishError;
use crate::session::Session;

use common::ErrorLocation;

use std::future::pending;
use std::panic::Location;
use std::time::Duration;

use humantime::format_duration;
use log::{debug, error};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::sleep as TokioSleep;

/// Launch cycles after which the log switches to "launching again".
const FIRST_LAUNCH_CYCLES: u32 = 2;

/// Produce a live [`Channel`] to the els server.
///
/// Resolves the configured port once, then loops: connect to the current
/// port; on failure launch (or relaunch) the server unless `no_launch` is
/// set; wait per the retry policy, waking early if a freshly launched
/// server reports its port; give up once `max_attempts` cycles failed.
///
/// # Errors
///
/// * [`EstablishError::Query`] - the port query failed; no connect attempt was made
/// * [`EstablishError::Exhausted`] - the attempt budget ran out; carries the last connect failure
pub async fn establish(session: &mut Session) -> Result<Channel, EstablishError> {
    establish_with(session, |host, port| async move { connect_once(&host, &port).await }).await
}

/// [`establish`] with the single connect attempt supplied by the caller.
///
/// `connect` receives the host and the port captured at attempt start.
pub(crate) async fn establish_with<C, F>(
    session: &mut Session,
    mut connect: C,
) -> Result<Channel, EstablishError>
where
    C: FnMut(String, String) -> F,
    F: Future<Output = Result<TcpStream, ConnectError>>,
{
    let Session {
        config,
        work_dir,
        port_state,
        supervisor,
        log,
    } = session;

    log.line("Obtaining els config ...");
    let configured = resolve_port(&config.port_query, work_dir)
        .await
        .inspect_err(|e| log.line(format!("Failed obtaining els port: {e}")))?;
    log.line(format!("Got configured els port {configured}"));
    port_state.replace(configured);

    let mut backoff = build_backoff(&config.retry);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let port = port_state.current();
        log.line(format!("Try connecting to els on port {port}"));

        let last = match connect(config.host.clone(), port.clone()).await {
            Ok(stream) => {
                log.line(format!("Connected to els on port {port}"));
                return Ok(Channel::new(stream, port, attempt));
            }
            Err(e) => {
                debug!("Connect attempt {attempt} failed: {e}");
                e
            }
        };

        let mut port_reported = None;
        if !config.no_launch {
            if attempt > FIRST_LAUNCH_CYCLES {
                log.line("Try launching els server again ... ");
            } else {
                log.line("Launching els server ... ");
            }
            // A failure is already logged by the supervisor; the next attempt
            // may still reach an externally started server.
            if let Ok(process) = supervisor.ensure_server_running(config.debug).await {
                port_reported = process.take_port_reported();
            }
        }

        let Some(wait) = backoff.next_backoff() else {
            return Err(give_up(attempt, last));
        };

        log.line(format!(
            "Waiting {} before try again ...",
            format_duration(round_to_millis(wait))
        ));

        tokio::select! {
            _ = TokioSleep(wait) => {}
            true = launched_port_reported(port_reported) => {
                debug!("Launched server reported its port, retrying early");
            }
        }

        if config
            .retry
            .max_attempts
            .is_some_and(|max| attempt >= max)
        {
            return Err(give_up(attempt, last));
        }
    }
}

/// Resolves `true` once the server launched this cycle published a port;
/// `false` if it closed its report without one. Pending when nothing was
/// launched.
async fn launched_port_reported(reported: Option<oneshot::Receiver<()>>) -> bool {
    match reported {
        Some(reported) => reported.await.is_ok(),
        None => pending().await,
    }
}

#[track_caller]
fn give_up(attempts: u32, last: ConnectError) -> EstablishError {
    error!("Can not connect to els server after {attempts} attempts, giving up.");
    EstablishError::exhausted(attempts, last)
}

/// One connect attempt against `host:port`, OS default timeout.
pub(crate) async fn connect_once(host: &str, port: &str) -> Result<TcpStream, ConnectError> {
    let port_number = match port.parse::<u16>() {
        Ok(0) | Err(_) => {
            return Err(ConnectError::InvalidPort {
                port: port.to_string(),
                message: format!("'{port}' is not a usable TCP port"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(n) => n,
    };

    TcpStream::connect((host, port_number))
        .await
        .map_err(|e| ConnectError::io(host, port, e))
}

fn round_to_millis(wait: Duration) -> Duration {
    Duration::from_millis(u64::try_from(wait.as_millis()).unwrap_or(u64::MAX))
}
