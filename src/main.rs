// Level walker driver
// Loads a scene (or builds the demo level), then runs the session from a
// winit event loop: input in, one tick per frame, pose and hover logged.
// Drawing is left to whatever presents the scene; this loop only simulates.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorIcon, Window},
};

use level_walker::engine::demo::demo_level;
use level_walker::engine::{CursorHint, InputState, Pose, SceneDescription, Session, SessionConfig};

/// Fixed tick for headless replay.
const HEADLESS_DT: f32 = 1.0 / 60.0;
/// Frames simulated after each replayed key; long enough for a step, a
/// bounce, or a physics hop to settle.
const FRAMES_PER_KEY: usize = 60;

#[derive(Parser, Debug)]
#[command(name = "level_walker")]
#[command(about = "Walk a character around a level with grid-derived colliders", long_about = None)]
struct Args {
    /// Scene description (JSON). Omit to use the built-in demo level.
    scene: Option<PathBuf>,

    /// Session configuration (TOML). Missing file means defaults.
    #[arg(long, default_value = "level_walker.toml")]
    config: PathBuf,

    /// Replay these keys (w/a/s/d) without a window and print the final pose
    #[arg(long)]
    headless: Option<String>,

    /// Seed for the demo level's decoration
    #[arg(long, default_value = "1")]
    seed: u64,
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = SessionConfig::load_or_default(&args.config);
    let scene = match &args.scene {
        Some(path) => SceneDescription::load(path).with_context(|| format!("loading scene {}", path.display()))?,
        None => {
            log::info!("no scene given, building demo level (seed {})", args.seed);
            demo_level(args.seed)
        }
    };

    let mut session = Session::new(config);
    session.load_scene(&scene).context("spawning scene")?;

    match &args.headless {
        Some(keys) => run_headless(&mut session, keys),
        None => run_windowed(session),
    }
}

fn run_headless(session: &mut Session, keys: &str) -> Result<()> {
    for key in keys.chars() {
        let outcome = session.handle_key(&key.to_string());
        log::info!("key {key:?}: {outcome:?}");
        for _ in 0..FRAMES_PER_KEY {
            session.tick(HEADLESS_DT);
        }
    }
    match session.character_pose() {
        Some(pose) => println!("{}", format_pose(&pose)),
        None => println!("no character"),
    }
    Ok(())
}

fn format_pose(pose: &Pose) -> String {
    format!(
        "pose: ({:.3}, {:.3}, {:.3}) yaw {:.3}",
        pose.position.x, pose.position.y, pose.position.z, pose.yaw
    )
}

// ============================================================================
// WINDOWED LOOP
// ============================================================================

#[allow(deprecated)]
fn run_windowed(mut session: Session) -> Result<()> {
    let event_loop = EventLoop::new()?;

    let window_attributes = Window::default_attributes()
        .with_title("Level Walker")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut input = InputState::new();
    let size = window.inner_size();
    input.window_size = (size.width, size.height);

    let mut last_frame = Instant::now();
    let mut last_pose = session.character_pose();
    let mut last_hint = CursorHint::Default;

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                input.process_event(event);
                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                ..
                            },
                        ..
                    } => control_flow.exit(),
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let dt = (now - last_frame).as_secs_f32();
                        last_frame = now;

                        if let Some(name) = session.handle_input(&mut input) {
                            log::info!("open popup for {name}");
                        }
                        session.tick(dt);
                        input.end_frame();

                        let hint = session.cursor_hint();
                        if hint != last_hint {
                            window.set_cursor(match hint {
                                CursorHint::Pointer => CursorIcon::Pointer,
                                CursorHint::Default => CursorIcon::Default,
                            });
                            last_hint = hint;
                        }

                        let pose = session.character_pose();
                        if pose != last_pose && !session.is_moving() {
                            if let Some(pose) = &pose {
                                log::info!("{}", format_pose(pose));
                            }
                            last_pose = pose;
                        }
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;
    Ok(())
}
