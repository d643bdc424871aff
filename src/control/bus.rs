//! D-Bus transport for the control surface
//!
//! Runs on its own thread with a current-thread tokio runtime. It owns no
//! HUD state: calls are handed to the event loop over a calloop channel and
//! the answer comes back on a oneshot.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use calloop::channel::Sender;
use thiserror::Error;
use zbus::fdo::{RequestNameFlags, RequestNameReply};
use zbus::{connection, fdo, interface, Connection};

use super::{object_path, ControlError, ControlRequest, SERVICE_NAME};

#[derive(Error, Debug)]
pub enum BusError {
    #[error("HUD already running ({0} is owned by another process)")]
    NameTaken(String),
    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),
    #[error("Failed to start bus thread: {0}")]
    Io(#[from] std::io::Error),
    #[error("Bus thread exited during startup")]
    Disconnected,
}

struct HudInterface {
    requests: Sender<ControlRequest>,
}

impl HudInterface {
    async fn forward(&self, method: &str, args: Vec<String>) -> Result<(), ControlError> {
        let (request, reply) = ControlRequest::new(method, args);
        self.requests
            .send(request)
            .map_err(|_| ControlError::Unavailable)?;
        reply.await.map_err(|_| ControlError::Unavailable)?
    }
}

#[interface(name = "com.alexhulbert.mercury.Hud")]
impl HudInterface {
    async fn hide(&self) -> fdo::Result<()> {
        Ok(self.forward("Hide", Vec::new()).await?)
    }

    async fn show(&self, codes: Vec<String>) -> fdo::Result<()> {
        Ok(self.forward("Show", codes).await?)
    }
}

/// Connect to the session bus, export the interface and claim the service
/// name. Fails with [`BusError::NameTaken`] if another daemon owns it.
async fn acquire(requests: Sender<ControlRequest>) -> Result<Connection, BusError> {
    let path = object_path(SERVICE_NAME);
    let connection = connection::Builder::session()?
        .serve_at(path.as_str(), HudInterface { requests })?
        .build()
        .await?;

    let reply = connection
        .request_name_with_flags(SERVICE_NAME, RequestNameFlags::DoNotQueue.into())
        .await;
    check_claim(reply)?;

    log::info!("Serving {} at {}", SERVICE_NAME, path);
    Ok(connection)
}

/// Only primary ownership counts; without queueing anything else means
/// another daemon holds the name.
fn check_claim(reply: zbus::Result<RequestNameReply>) -> Result<(), BusError> {
    match reply {
        Ok(RequestNameReply::PrimaryOwner | RequestNameReply::AlreadyOwner) => Ok(()),
        Ok(_) | Err(zbus::Error::NameTaken) => Err(BusError::NameTaken(SERVICE_NAME.to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Start the bus thread and wait until the service name is ours.
///
/// Once this returns `Ok`, calls start flowing into `requests`. The channel
/// closes if the bus thread ever stops.
pub fn spawn_bus(requests: Sender<ControlRequest>) -> Result<JoinHandle<()>, BusError> {
    let (ready_tx, ready_rx) = mpsc::sync_channel(1);

    let thread = thread::Builder::new()
        .name("hud-bus".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = ready_tx.send(Err(BusError::Io(e)));
                    return;
                }
            };

            runtime.block_on(async move {
                let connection = match acquire(requests).await {
                    Ok(connection) => connection,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                std::future::pending::<()>().await;
                drop(connection);
            });
        })?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(thread),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(BusError::Disconnected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calloop::channel::{self, Event};
    use calloop::EventLoop;
    use std::time::Duration;

    #[test]
    fn test_claim_requires_primary_ownership() {
        assert!(check_claim(Ok(RequestNameReply::PrimaryOwner)).is_ok());
        assert!(check_claim(Ok(RequestNameReply::AlreadyOwner)).is_ok());

        for reply in [RequestNameReply::Exists, RequestNameReply::InQueue] {
            assert!(matches!(check_claim(Ok(reply)), Err(BusError::NameTaken(_))));
        }
        assert!(matches!(
            check_claim(Err(zbus::Error::NameTaken)),
            Err(BusError::NameTaken(_))
        ));
        assert!(matches!(
            check_claim(Err(zbus::Error::Failure("bus went away".to_string()))),
            Err(BusError::Bus(_))
        ));
    }

    #[tokio::test]
    async fn test_forward_without_event_loop_is_unavailable() {
        let (requests, control_channel) = channel::channel::<ControlRequest>();
        drop(control_channel);

        let hud = HudInterface { requests };
        assert_eq!(
            hud.forward("Hide", Vec::new()).await,
            Err(ControlError::Unavailable)
        );
    }

    #[tokio::test]
    async fn test_forward_returns_event_loop_answer() {
        let (requests, control_channel) = channel::channel::<ControlRequest>();

        let event_loop_thread = std::thread::spawn(move || {
            let mut event_loop: EventLoop<Option<(String, Vec<String>)>> =
                EventLoop::try_new().unwrap();
            event_loop
                .handle()
                .insert_source(control_channel, |event, _, seen| {
                    if let Event::Msg(request) = event {
                        *seen = Some((request.method.clone(), request.args.clone()));
                        let _ = request.reply.send(Err(ControlError::InvalidCode {
                            index: 0,
                            value: "zzzz".to_string(),
                        }));
                    }
                })
                .unwrap();

            let mut seen = None;
            while seen.is_none() {
                event_loop
                    .dispatch(Duration::from_millis(100), &mut seen)
                    .unwrap();
            }
            seen
        });

        let hud = HudInterface { requests };
        let result = hud.forward("Show", vec!["zzzz".to_string()]).await;

        assert_eq!(
            result,
            Err(ControlError::InvalidCode {
                index: 0,
                value: "zzzz".to_string()
            })
        );
        assert_eq!(
            event_loop_thread.join().unwrap(),
            Some(("Show".to_string(), vec!["zzzz".to_string()]))
        );
    }

    #[tokio::test]
    async fn test_dropped_reply_is_unavailable() {
        let (requests, control_channel) = channel::channel::<ControlRequest>();

        let event_loop_thread = std::thread::spawn(move || {
            let mut event_loop: EventLoop<bool> = EventLoop::try_new().unwrap();
            event_loop
                .handle()
                .insert_source(control_channel, |event, _, done| {
                    if let Event::Msg(request) = event {
                        drop(request);
                        *done = true;
                    }
                })
                .unwrap();

            let mut done = false;
            while !done {
                event_loop
                    .dispatch(Duration::from_millis(100), &mut done)
                    .unwrap();
            }
        });

        let hud = HudInterface { requests };
        assert_eq!(
            hud.forward("Hide", Vec::new()).await,
            Err(ControlError::Unavailable)
        );
        event_loop_thread.join().unwrap();
    }

    #[tokio::test]
    #[ignore = "needs a session bus without a running hudd"]
    async fn test_second_daemon_cannot_claim_name() {
        let (first, _first_channel) = channel::channel::<ControlRequest>();
        let _owner = acquire(first).await.unwrap();

        let (second, _second_channel) = channel::channel::<ControlRequest>();
        assert!(matches!(
            acquire(second).await,
            Err(BusError::NameTaken(_))
        ));
    }
}
