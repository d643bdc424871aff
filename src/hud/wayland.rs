//! Wayland layer-shell integration

use anyhow::{anyhow, Result};
use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState},
    delegate_compositor, delegate_layer, delegate_output, delegate_registry, delegate_shm,
    output::{OutputHandler, OutputState},
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    shell::{
        wlr_layer::{
            Anchor, KeyboardInteractivity, Layer, LayerShell, LayerShellHandler, LayerSurface,
            LayerSurfaceConfigure,
        },
        WaylandSurface,
    },
    shm::{slot::SlotPool, Shm, ShmHandler},
};
use wayland_client::{
    globals::GlobalList,
    protocol::{wl_buffer::WlBuffer, wl_output, wl_shm, wl_surface},
    Connection, Proxy, QueueHandle,
};

use super::render::Renderer;
use super::state::DaemonState;
use super::PrimaryDisplay;
use crate::control::{dispatch, ControlRequest, Effect};

const NAMESPACE: &str = "hud";

/// The overlay window plus the state it displays
pub struct HudApp {
    registry_state: RegistryState,
    output_state: OutputState,
    compositor_state: CompositorState,
    shm: Shm,
    layer_shell: LayerShell,
    qh: QueueHandle<Self>,

    state: DaemonState,
    renderer: Renderer,

    // Output the surface is bound to and measured against
    output: Option<wl_output::WlOutput>,
    layer_surface: Option<LayerSurface>,
    pool: Option<SlotPool>,
    // A configure arrived since the last (re)map request
    configured: bool,
    pub exit: bool,
}

impl HudApp {
    pub fn new(
        globals: &GlobalList,
        qh: &QueueHandle<Self>,
        state: DaemonState,
        renderer: Renderer,
    ) -> Result<Self> {
        let registry_state = RegistryState::new(globals);
        let output_state = OutputState::new(globals, qh);
        let compositor_state = CompositorState::bind(globals, qh)?;
        let shm = Shm::bind(globals, qh)?;
        let layer_shell = LayerShell::bind(globals, qh)?;

        Ok(Self {
            registry_state,
            output_state,
            compositor_state,
            shm,
            layer_shell,
            qh: qh.clone(),
            state,
            renderer,
            output: None,
            layer_surface: None,
            pool: None,
            configured: false,
            exit: false,
        })
    }

    pub fn state(&self) -> &DaemonState {
        &self.state
    }

    /// Pick the output, compute the position and create the (unmapped) window
    pub fn open_window(&mut self) {
        self.select_output(None);
        self.refresh_position();
        self.create_layer_surface();
    }

    /// Run one control call and answer the caller
    pub fn handle_request(&mut self, request: ControlRequest) {
        log::debug!("Control call: {}({})", request.method, request.args.join(", "));

        let display = OutputDisplay {
            outputs: &self.output_state,
            output: self.output.as_ref(),
        };
        let result = dispatch(&mut self.state, &display, &request.method, &request.args);

        match &result {
            Ok(effect) => self.apply(*effect),
            Err(e) => log::warn!("Rejected {} call: {}", request.method, e),
        }

        if request.reply.send(result.map(|_| ())).is_err() {
            log::debug!("Caller went away before the reply");
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Present => self.present(),
            Effect::Withdraw => self.withdraw(),
            Effect::None => {}
        }
    }

    fn primary_width(&self) -> Option<i32> {
        OutputDisplay {
            outputs: &self.output_state,
            output: self.output.as_ref(),
        }
        .primary_width()
    }

    fn refresh_position(&mut self) {
        match self.state.reposition(self.primary_width()) {
            Some(position) => log::info!("Overlay position: {},{}", position.x, position.y),
            None => log::warn!("Output size unknown, anchoring to the top-right corner"),
        }
    }

    /// Keep the current output while it exists, otherwise take the first
    /// one that is not `gone`. Returns whether the choice changed.
    fn select_output(&mut self, gone: Option<&wl_output::WlOutput>) -> bool {
        let available: Vec<_> = self.output_state.outputs().collect();
        let next = choose_output(self.output.as_ref(), &available, gone);
        if next == self.output {
            return false;
        }

        log::debug!("Overlay output: {:?}", next.as_ref().map(|o| o.id()));
        self.output = next;
        true
    }

    fn present(&mut self) {
        if self.layer_surface.is_none() {
            self.create_layer_surface();
        }

        self.place();
        if self.configured {
            if let Err(e) = self.draw() {
                log::error!("Draw error: {}", e);
            }
        }
    }

    fn withdraw(&mut self) {
        let Some(layer_surface) = &self.layer_surface else {
            return;
        };

        // A null buffer unmaps; the next commit starts a fresh configure cycle
        let surface = layer_surface.wl_surface();
        surface.attach(None, 0, 0);
        surface.commit();
        self.configured = false;
        log::debug!("Overlay hidden");
    }

    fn create_layer_surface(&mut self) {
        let surface = self.compositor_state.create_surface(&self.qh);

        let layer_surface = self.layer_shell.create_layer_surface(
            &self.qh,
            surface,
            Layer::Overlay,
            Some(NAMESPACE),
            self.output.as_ref(),
        );

        let size = self.state.geometry().window_size;
        layer_surface.set_keyboard_interactivity(KeyboardInteractivity::None);
        layer_surface.set_size(size, size);
        layer_surface.set_exclusive_zone(0);

        self.layer_surface = Some(layer_surface);
        self.configured = false;
        self.place();
    }

    /// Layer surfaces cannot change output, so build a new one on the current output
    fn rebind_surface(&mut self) {
        self.layer_surface = None;
        self.refresh_position();
        self.create_layer_surface();
    }

    /// Apply the current position to the layer surface and commit
    fn place(&self) {
        let Some(layer_surface) = &self.layer_surface else {
            return;
        };

        match self.state.position() {
            Some(position) => {
                layer_surface.set_anchor(Anchor::TOP | Anchor::LEFT);
                layer_surface.set_margin(position.y, 0, 0, position.x);
            }
            None => {
                let padding = self.state.geometry().padding;
                layer_surface.set_anchor(Anchor::TOP | Anchor::RIGHT);
                layer_surface.set_margin(padding, padding, 0, 0);
            }
        }

        layer_surface.wl_surface().commit();
    }

    fn draw(&mut self) -> Result<()> {
        let Some(layer_surface) = &self.layer_surface else {
            return Ok(());
        };

        let size = self.state.geometry().window_size;
        let side = i32::try_from(size)?;
        let stride = side
            .checked_mul(4)
            .ok_or_else(|| anyhow!("Window size {} too large", size))?;
        let len = usize::try_from(stride)? * usize::try_from(side)?;

        if self.pool.is_none() {
            self.pool = Some(SlotPool::new(len, &self.shm)?);
        }
        let pool = self
            .pool
            .as_mut()
            .ok_or_else(|| anyhow!("Buffer pool unavailable"))?;

        let mut pixmap =
            tiny_skia::Pixmap::new(size, size).ok_or_else(|| anyhow!("Failed to create pixmap"))?;
        self.renderer.render(&mut pixmap, &self.state);

        let (buffer, canvas) = pool.create_buffer(side, side, stride, wl_shm::Format::Argb8888)?;

        // tiny-skia is premultiplied RGBA, ARGB8888 is premultiplied BGRA in memory
        for (dst, src) in canvas
            .chunks_exact_mut(4)
            .zip(pixmap.data().chunks_exact(4))
        {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
            dst[3] = src[3];
        }

        let wl_buffer: &WlBuffer = buffer.wl_buffer();
        let surface = layer_surface.wl_surface();
        surface.attach(Some(wl_buffer), 0, 0);
        surface.damage_buffer(0, 0, side, side);
        surface.commit();

        Ok(())
    }

    /// Output geometry changed: follow it if we are on screen
    fn screen_changed(&mut self) {
        self.state.reposition(self.primary_width());
        if self.state.is_visible() {
            self.place();
        }
    }
}

/// Output choice: the current one while it is still advertised, otherwise
/// the first advertised one that is not `gone`.
fn choose_output<T: PartialEq + Clone>(
    current: Option<&T>,
    available: &[T],
    gone: Option<&T>,
) -> Option<T> {
    let usable = |output: &&T| Some(*output) != gone;

    current
        .filter(|current| available.contains(*current))
        .filter(usable)
        .or_else(|| available.iter().find(usable))
        .cloned()
}

/// Width source for dispatch: the output the overlay is bound to.
///
/// Wayland has no primary output; the first advertised one stands in.
struct OutputDisplay<'a> {
    outputs: &'a OutputState,
    output: Option<&'a wl_output::WlOutput>,
}

impl PrimaryDisplay for OutputDisplay<'_> {
    fn primary_width(&self) -> Option<i32> {
        let info = self.outputs.info(self.output?)?;

        info.logical_size.map(|(width, _)| width).or_else(|| {
            info.modes
                .iter()
                .find(|mode| mode.current)
                .map(|mode| mode.dimensions.0 / info.scale_factor.max(1))
        })
    }
}

delegate_compositor!(HudApp);
delegate_output!(HudApp);
delegate_shm!(HudApp);
delegate_layer!(HudApp);
delegate_registry!(HudApp);

impl CompositorHandler for HudApp {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_factor: i32,
    ) {
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {
    }

    fn frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
        // Redraws are driven by control calls, not by frame pacing
    }

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }
}

impl OutputHandler for HudApp {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        if self.select_output(None) && self.layer_surface.is_some() {
            self.rebind_surface();
        }
    }

    fn update_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        output: wl_output::WlOutput,
    ) {
        if self.output.as_ref() == Some(&output) {
            self.screen_changed();
        }
    }

    fn output_destroyed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        output: wl_output::WlOutput,
    ) {
        if self.select_output(Some(&output)) {
            log::info!("Overlay output went away, moving the overlay");
            self.rebind_surface();
        }
    }
}

impl LayerShellHandler for HudApp {
    fn closed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _layer: &LayerSurface) {
        log::warn!("Compositor closed the overlay surface");
        self.state.hide();
        self.layer_surface = None;
        self.configured = false;
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _layer: &LayerSurface,
        configure: LayerSurfaceConfigure,
        _serial: u32,
    ) {
        log::debug!("Configure: {:?}", configure.new_size);

        self.configured = true;
        if !self.state.is_visible() {
            return;
        }
        if let Err(e) = self.draw() {
            log::error!("Draw error: {}", e);
        }
    }
}

impl ShmHandler for HudApp {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm
    }
}

impl ProvidesRegistryState for HudApp {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }
    registry_handlers![OutputState];
}
