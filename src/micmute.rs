use anyhow::Result;
use micmute::{DEFAULT_LOG_LEVEL, LOG_ENV};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .init();

    app::run()
}

#[cfg(not(target_os = "macos"))]
mod app {
    pub fn run() -> anyhow::Result<()> {
        anyhow::bail!("{} only runs on macOS", micmute::APP_NAME_PRETTY)
    }
}

#[cfg(target_os = "macos")]
mod app {
    use std::time::Instant;

    use anyhow::{Context, Result};
    use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
    use micmute::config_ext::ConfigExt;
    use micmute::event::MicMuteEvent;
    use micmute::icon::{self, TrayGlyph};
    use micmute::{
        APP_NAME_PRETTY, ConfigManager, CoreAudioHardware, DeviceChangeWatcher, MuteStateMachine,
        Osascript, ToggleOutcome, VERSION,
    };
    use tao::event::{Event, StartCause};
    use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
    use tao::platform::macos::{ActivationPolicy, EventLoopExtMacOS};
    use tracing::{debug, error, info, warn};
    use tray_icon::menu::{AboutMetadataBuilder, Menu, MenuEvent, MenuItem, PredefinedMenuItem};
    use tray_icon::{MouseButton, MouseButtonState, TrayIcon, TrayIconBuilder, TrayIconEvent};

    type Machine = MuteStateMachine<CoreAudioHardware, Osascript>;

    pub fn run() -> Result<()> {
        // Load config
        let config_manager = ConfigManager::new()?;
        let config = config_manager.load()?;
        // save back the config to create the file if it doesn't exist
        config_manager.save(&config)?;

        // Set up hotkey
        let hotkey = config.parsed_hotkey();
        let hotkey_manager =
            GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;
        hotkey_manager
            .register(hotkey)
            .context("Failed to register hotkey")?;

        let mut machine = MuteStateMachine::new(CoreAudioHardware::new(), Osascript::new())
            .with_grace_period(config.grace_period())
            .with_virtual_devices(config.include_virtual_devices);

        // Create the tray menu
        let tray_menu = Menu::new();
        let device_item = MenuItem::new(machine.current_device_label(), false, None);
        let toggle_item = MenuItem::new("Toggle Mute", true, None);
        let quit_item = MenuItem::new(format!("Quit {APP_NAME_PRETTY}"), true, None);
        tray_menu.append_items(&[
            &device_item,
            &PredefinedMenuItem::separator(),
            &toggle_item,
            &PredefinedMenuItem::about(
                None,
                Some(
                    AboutMetadataBuilder::new()
                        .name(Some(APP_NAME_PRETTY.to_owned()))
                        .version(Some(VERSION.to_owned()))
                        .build(),
                ),
            ),
            &PredefinedMenuItem::separator(),
            &quit_item,
        ])?;

        let mut event_loop: EventLoop<MicMuteEvent> = EventLoopBuilder::with_user_event().build();
        event_loop.set_activation_policy(ActivationPolicy::Accessory);

        // Every input is funneled into the loop so the state machine is only
        // touched from this thread.
        let proxy = event_loop.create_proxy();
        TrayIconEvent::set_event_handler(Some(move |event: TrayIconEvent| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                proxy.send_event(MicMuteEvent::ToggleRequested).ok();
            }
        }));

        let proxy = event_loop.create_proxy();
        let (toggle_id, quit_id) = (toggle_item.id().clone(), quit_item.id().clone());
        MenuEvent::set_event_handler(Some(move |event: MenuEvent| {
            if event.id == toggle_id {
                proxy.send_event(MicMuteEvent::ToggleRequested).ok();
            } else if event.id == quit_id {
                proxy.send_event(MicMuteEvent::QuitRequested).ok();
            }
        }));

        let proxy = event_loop.create_proxy();
        let hotkey_id = hotkey.id();
        GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
            if event.id() == hotkey_id && event.state() == HotKeyState::Pressed {
                proxy.send_event(MicMuteEvent::ToggleRequested).ok();
            }
        }));

        let proxy = event_loop.create_proxy();
        let mut watcher = match DeviceChangeWatcher::start(move || {
            proxy.send_event(MicMuteEvent::DeviceChanged).ok();
        }) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!(error = %e, "Device changes will not be tracked");
                None
            }
        };

        let mut tray: Option<TrayIcon> = None;

        event_loop.run(move |event, _, control_flow| {
            machine.poll(Instant::now());

            match event {
                Event::NewEvents(StartCause::Init) => {
                    // We create the icon once the event loop is actually running
                    // to prevent issues like https://github.com/tauri-apps/tray-icon/issues/90
                    match build_tray(&tray_menu, &machine) {
                        Ok(icon) => tray = Some(icon),
                        Err(e) => error!(error = ?e, "Failed to create tray icon"),
                    }

                    // We have to request a redraw here to have the icon actually show up.
                    // Tao only exposes a redraw method on the Window so we use
                    // core-foundation directly.
                    unsafe {
                        use core_foundation::runloop::{CFRunLoopGetMain, CFRunLoopWakeUp};

                        let rl = CFRunLoopGetMain();
                        CFRunLoopWakeUp(rl);
                    }

                    info!(hotkey = config.hotkey(), "{APP_NAME_PRETTY} ready");
                }
                Event::UserEvent(MicMuteEvent::ToggleRequested) => {
                    if machine.toggle() != ToggleOutcome::Ignored {
                        refresh(tray.as_ref(), &device_item, &machine);
                    }
                }
                Event::UserEvent(MicMuteEvent::DeviceChanged) => {
                    debug!("Audio devices changed");
                    machine.on_device_changed();
                    refresh(tray.as_ref(), &device_item, &machine);
                }
                Event::UserEvent(MicMuteEvent::QuitRequested) => {
                    *control_flow = ControlFlow::Exit;
                    return;
                }
                Event::LoopDestroyed => {
                    machine.quit();
                    watcher.take();
                    tray.take();
                    info!("Exiting");
                    return;
                }
                _ => {}
            }

            *control_flow = match machine.settle_deadline() {
                Some(at) => ControlFlow::WaitUntil(at),
                None => ControlFlow::Wait,
            };
        })
    }

    /// Icon and device label for the current state.
    fn glyph(machine: &Machine) -> (TrayGlyph, String) {
        let name = machine.current_device_name();
        let glyph = TrayGlyph::new(machine.mic_state(), name.is_some());
        let label = name.unwrap_or_else(|| machine.current_device_label());
        (glyph, label)
    }

    fn build_tray(menu: &Menu, machine: &Machine) -> Result<TrayIcon> {
        let (glyph, label) = glyph(machine);
        TrayIconBuilder::new()
            .with_menu(Box::new(menu.clone()))
            .with_menu_on_left_click(false)
            .with_tooltip(glyph.tooltip(&label))
            .with_icon(icon::to_tray_icon(glyph)?)
            .with_icon_as_template(glyph.is_template())
            .build()
            .context("Failed to build tray icon")
    }

    fn refresh(tray: Option<&TrayIcon>, device_item: &MenuItem, machine: &Machine) {
        let (glyph, label) = glyph(machine);
        device_item.set_text(&label);

        let Some(tray) = tray else {
            return;
        };
        match icon::to_tray_icon(glyph) {
            Ok(icon) => {
                if let Err(e) = tray.set_icon_with_as_template(Some(icon), glyph.is_template()) {
                    warn!(error = %e, "Failed to update tray icon");
                }
            }
            Err(e) => error!(error = %e, "Failed to render tray icon"),
        }
        if let Err(e) = tray.set_tooltip(Some(glyph.tooltip(&label))) {
            warn!(error = %e, "Failed to update tooltip");
        }
    }
}
