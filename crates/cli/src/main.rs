mod console;
mod controllers;

use std::sync::Arc;

use anyhow::Result;
use mochi_behaviors::default_catalog;
use mochi_engine::{
    Collaborators, Engine, EngineCfg, EngineHandle, FlagRegistry, GateFn, NoticeReceiver, flag,
};
use rustyline::error::ReadlineError;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use console::{ConsoleScene, ConsoleSound, ConsoleSpeech};
use controllers::InteractionControllers;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cfg = EngineCfg::from_env().sanitized();
    let (cfg_tx, cfg_rx) = mochi_engine::config::channel(cfg);

    let flags = FlagRegistry::new();
    let scene = Arc::new(ConsoleScene::with_items(&["plant", "lamp", "picture frame"]));
    let collab = Collaborators {
        sound: Arc::new(ConsoleSound),
        speech: Arc::new(ConsoleSpeech),
        scene: scene.clone(),
    };
    let catalog = Arc::new(default_catalog()?);

    // Autonomous behavior is permitted only while nothing interactive holds
    // the drag or menu flags.
    let gate: GateFn = {
        let flags = flags.clone();
        Arc::new(move || !flags.any_disabled(&[flag::DRAG, flag::MENU]))
    };

    let (mut engine, handle, notice_rx) = Engine::new(cfg_rx, catalog, flags.clone(), gate, collab);
    let token = handle.token();
    spawn_sigint_canceler(token.clone());

    let engine_task = tokio::spawn(async move { engine.run().await });

    println!("mochi is awake. Type `help` for commands.");
    run_repl(&handle, notice_rx, flags, scene, cfg_tx, token).await?;

    handle.stop();
    engine_task.await?;
    println!("bye.");
    Ok(())
}

async fn run_repl(
    handle: &EngineHandle,
    mut notices: NoticeReceiver,
    flags: FlagRegistry,
    scene: Arc<ConsoleScene>,
    cfg_tx: watch::Sender<EngineCfg>,
    token: CancellationToken,
) -> Result<()> {
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<InputEvent>();
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
    spawn_input_thread(line_tx, ready_rx);
    request_next_prompt(&ready_tx);

    let mut controllers = InteractionControllers::new(flags.clone());

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            notice = notices.recv() => {
                let Some(notice) = notice else { break };
                println!("* mochi decided to: {} ({})", notice.display_name, notice.id);
            }
            line = line_rx.recv() => {
                let Some(event) = line else { break };
                match event {
                    InputEvent::Line(line) => {
                        let quit = handle_line(
                            line.trim(),
                            handle,
                            &mut controllers,
                            &flags,
                            &scene,
                            &cfg_tx,
                        )
                        .await;
                        if quit {
                            break;
                        }
                        request_next_prompt(&ready_tx);
                    }
                    InputEvent::Interrupted | InputEvent::Eof => break,
                    InputEvent::Error(err) => {
                        eprintln!("input error: {err}");
                        break;
                    }
                }
            }
        }
    }
    drop(ready_tx);
    Ok(())
}

/// Handle one REPL line. Returns true when the user asked to quit.
async fn handle_line(
    line: &str,
    handle: &EngineHandle,
    controllers: &mut InteractionControllers,
    flags: &FlagRegistry,
    scene: &ConsoleScene,
    cfg_tx: &watch::Sender<EngineCfg>,
) -> bool {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return false;
    };
    let arg = parts.next();

    match (cmd, arg) {
        ("help", _) => {
            println!("commands:");
            println!("  list                  behaviors with cooldown state");
            println!("  trigger <id>          start a behavior now");
            println!("  auto                  start one behavior from the weighted pool");
            println!("  cooldown <id>         remaining cooldown for a behavior");
            println!("  status                engine status snapshot");
            println!("  flags                 holders of the well-known flags");
            println!("  drag on|off           simulate dragging the mascot");
            println!("  menu on|off           simulate the start menu");
            println!("  decorate <name>       add a scene decoration");
            println!("  pause / resume        toggle autonomous behavior");
            println!("  quit                  exit");
        }
        ("list", _) => {
            for (id, name) in handle.events() {
                let state = match handle.cooldown_text(&id) {
                    Some(text) => format!("cooldown {text}"),
                    None if handle.is_event_enabled(&id) => "ready".to_owned(),
                    None => "disabled".to_owned(),
                };
                println!("  {id:<18} {name:<28} [{state}]");
            }
        }
        ("trigger", Some(id)) => {
            if handle.trigger_event(id).await {
                println!("started.");
            } else {
                println!("refused (unknown id, busy, gated, or cooling down).");
            }
        }
        ("auto", _) => {
            if handle.attempt_event_trigger().await {
                println!("started.");
            } else {
                println!("nothing eligible right now.");
            }
        }
        ("cooldown", Some(id)) => match handle.cooldown_text(id) {
            Some(text) => println!("{id}: {text} remaining"),
            None => println!("{id}: ready"),
        },
        ("status", _) => {
            let s = handle.status();
            println!(
                "active: {:?}, started: {}, finished: {}, forced: {}",
                s.active, s.runs_started, s.runs_finished, s.runs_forced
            );
        }
        ("flags", _) => {
            for f in [
                flag::DRAG,
                flag::BLINK,
                flag::PETTING,
                flag::MENU,
                flag::EYE_TRACKING,
                flag::DECORATIONS,
            ] {
                let holders = flags.holders(f);
                if holders.is_empty() {
                    println!("  {f:<14} enabled");
                } else {
                    println!("  {f:<14} held by {holders:?}");
                }
            }
        }
        ("drag", Some(state)) => {
            controllers.set_dragging(state == "on");
            println!("dragging: {}", controllers.is_dragging());
        }
        ("menu", Some(state)) => {
            controllers.set_menu_open(state == "on");
            println!("menu open: {}", controllers.is_menu_open());
        }
        ("decorate", Some(name)) => {
            scene.add_decoration(name);
            println!("decorations: {:?}", scene.list());
        }
        ("pause", _) => {
            cfg_tx.send_modify(|cfg| cfg.enabled = false);
            println!("autonomous behavior paused.");
        }
        ("resume", _) => {
            cfg_tx.send_modify(|cfg| cfg.enabled = true);
            println!("autonomous behavior resumed.");
        }
        ("quit" | "q" | "exit", _) => return true,
        _ => println!("unknown command, try `help`."),
    }
    false
}

fn request_next_prompt(ready_tx: &std::sync::mpsc::Sender<()>) {
    let _ = ready_tx.send(());
}

fn spawn_input_thread(
    line_tx: mpsc::UnboundedSender<InputEvent>,
    ready_rx: std::sync::mpsc::Receiver<()>,
) {
    std::thread::spawn(move || {
        let mut editor = match rustyline::DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                let _ = line_tx.send(InputEvent::Error(e.to_string()));
                return;
            }
        };

        while ready_rx.recv().is_ok() {
            match editor.readline("mochi> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(&line);
                    if line_tx.send(InputEvent::Line(line)).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    let _ = line_tx.send(InputEvent::Interrupted);
                    break;
                }
                Err(ReadlineError::Eof) => {
                    let _ = line_tx.send(InputEvent::Eof);
                    break;
                }
                Err(e) => {
                    let _ = line_tx.send(InputEvent::Error(e.to_string()));
                    break;
                }
            }
        }
    });
}

enum InputEvent {
    Line(String),
    Interrupted,
    Eof,
    Error(String),
}

fn spawn_sigint_canceler(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            if let Ok(mut sigint) =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            {
                let _ = sigint.recv().await;
                token.cancel();
            }
        }
        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        }
    });
}
