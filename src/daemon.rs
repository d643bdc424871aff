//! Daemon startup and event loop

use anyhow::{anyhow, Context, Result};
use calloop::channel::{self, Event};
use calloop::EventLoop;
use smithay_client_toolkit::reexports::calloop_wayland_source::WaylandSource;
use wayland_client::{globals::registry_queue_init, Connection};

use crate::config::Settings;
use crate::control::{spawn_bus, BusError, ControlRequest};
use crate::hud::{DaemonState, GlyphFont, HudApp, Renderer};

/// Fatal startup failures
#[derive(thiserror::Error, Debug)]
pub enum DaemonError {
    #[error("HUD already running")]
    AlreadyRunning,
    #[error(transparent)]
    Bus(BusError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<BusError> for DaemonError {
    fn from(error: BusError) -> Self {
        match error {
            BusError::NameTaken(_) => DaemonError::AlreadyRunning,
            other => DaemonError::Bus(other),
        }
    }
}

/// Claim the service name, open the overlay and serve until disconnected
pub fn run(settings: Settings) -> Result<(), DaemonError> {
    let colors = settings.colors().context("Invalid colors in settings")?;

    // The name must be ours before any window exists
    let (requests, control_channel) = channel::channel::<ControlRequest>();
    let _bus = spawn_bus(requests)?;

    let font = GlyphFont::load(&settings.font_family).context("Failed to load HUD font")?;
    log::info!("Using font '{}'", font.family());

    let conn = Connection::connect_to_env().context("Failed to connect to Wayland")?;
    let (globals, mut event_queue) =
        registry_queue_init::<HudApp>(&conn).context("Failed to read Wayland globals")?;
    let qh = event_queue.handle();

    let state = DaemonState::new(settings.geometry(), colors);
    let renderer = Renderer::new(font, settings.glyph_size);
    let mut app = HudApp::new(&globals, &qh, state, renderer)?;

    // Let outputs announce their geometry before the window is created
    event_queue
        .roundtrip(&mut app)
        .context("Initial Wayland roundtrip failed")?;
    app.open_window();

    let mut event_loop: EventLoop<HudApp> =
        EventLoop::try_new().context("Failed to create event loop")?;
    let handle = event_loop.handle();

    WaylandSource::new(conn, event_queue)
        .insert(handle.clone())
        .map_err(|e| anyhow!("Failed to watch Wayland connection: {}", e.error))?;

    handle
        .insert_source(control_channel, |event, _, app: &mut HudApp| match event {
            Event::Msg(request) => app.handle_request(request),
            Event::Closed => {
                log::error!("Control surface went away, shutting down");
                app.exit = true;
            }
        })
        .map_err(|e| anyhow!("Failed to watch control channel: {}", e.error))?;

    log::info!("HUD ready (hidden)");

    while !app.exit {
        event_loop
            .dispatch(None, &mut app)
            .context("Event loop failed")?;
    }

    log::info!("Shutting down, overlay was {:?}", app.state().visibility());
    Ok(())
}
