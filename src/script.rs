// ============================================================================
// Command scripts — line-oriented drawing commands replayed on a Session
// ============================================================================
//
//   tool brush
//   color #ff0000
//   size 1
//   down 10 10
//   move 20 20
//   up
//   fill 50 50 #00ff00
//   layer add Ink
//   font fonts/DejaVuSans.ttf
//   undo
//
// Lines starting with `#` are comments.  Coordinates are view space, like
// pointer input.

use std::path::{Path, PathBuf};

use image::Rgba;

use crate::components::tools::Tool;
use crate::error::{PaintError, Result};
use crate::ops::color_mix::{parse_hex, MixStrategy};
use crate::ops::text::load_font_file;
use crate::project::Session;
use crate::{log_info, log_warn};

#[derive(Clone, Debug, PartialEq)]
pub enum LayerCommand {
    Add(Option<String>),
    /// `None` targets the active layer.
    Remove(Option<usize>),
    Up(Option<usize>),
    Down(Option<usize>),
    Select(usize),
    Show(usize),
    Hide(usize),
    Opacity(usize, f32),
    Rename(usize, String),
    Clear,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScriptCommand {
    Tool(Tool),
    Color(Rgba<u8>),
    Size(f32),
    Alpha(f32),
    Mix(Option<MixStrategy>),
    Down(f32, f32),
    Move(f32, f32),
    Up,
    Leave,
    Fill { x: f32, y: f32, color: Option<Rgba<u8>> },
    Text(String),
    CancelText,
    Layer(LayerCommand),
    Undo,
    Redo,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    Pan(f32, f32),
    Import(PathBuf),
    /// Font file used for later `text` commands.
    Font(PathBuf),
}

fn script_err(line: usize, message: impl Into<String>) -> PaintError {
    PaintError::Script { line, message: message.into() }
}

/// Parse one line.  Blank and comment lines yield `None`.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<ScriptCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let num = |i: usize| -> Result<f32> {
        let raw = args.get(i).ok_or_else(|| script_err(line_no, format!("`{word}` needs more arguments")))?;
        raw.parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| script_err(line_no, format!("`{raw}` is not a number")))
    };
    let index = |i: usize| -> Result<usize> {
        let raw = args.get(i).ok_or_else(|| script_err(line_no, format!("`{word}` needs a layer index")))?;
        raw.parse::<usize>()
            .map_err(|_| script_err(line_no, format!("`{raw}` is not a layer index")))
    };
    let opt_index = |i: usize| -> Result<Option<usize>> {
        if args.len() > i { index(i).map(Some) } else { Ok(None) }
    };
    let color = |raw: &str| -> Result<Rgba<u8>> {
        parse_hex(raw).ok_or_else(|| script_err(line_no, format!("`{raw}` is not a #rgb or #rrggbb color")))
    };

    let cmd = match word.to_ascii_lowercase().as_str() {
        "tool" => ScriptCommand::Tool(rest.parse::<Tool>().map_err(|m| script_err(line_no, m))?),
        "color" => ScriptCommand::Color(color(rest)?),
        "size" => ScriptCommand::Size(num(0)?),
        "alpha" => ScriptCommand::Alpha(num(0)?),
        "mix" => {
            if rest.eq_ignore_ascii_case("none") {
                ScriptCommand::Mix(None)
            } else {
                let strategy = rest.parse::<MixStrategy>().map_err(|m| script_err(line_no, m))?;
                ScriptCommand::Mix(Some(strategy))
            }
        }
        "down" => ScriptCommand::Down(num(0)?, num(1)?),
        "move" => ScriptCommand::Move(num(0)?, num(1)?),
        "up" => ScriptCommand::Up,
        "leave" => ScriptCommand::Leave,
        "fill" => ScriptCommand::Fill {
            x: num(0)?,
            y: num(1)?,
            color: match args.get(2) {
                Some(raw) => Some(color(*raw)?),
                None => None,
            },
        },
        "text" => ScriptCommand::Text(rest.to_string()),
        "cancel-text" => ScriptCommand::CancelText,
        "undo" => ScriptCommand::Undo,
        "redo" => ScriptCommand::Redo,
        "zoom" => match rest.to_ascii_lowercase().as_str() {
            "in" => ScriptCommand::ZoomIn,
            "out" => ScriptCommand::ZoomOut,
            "reset" => ScriptCommand::ZoomReset,
            other => return Err(script_err(line_no, format!("unknown zoom `{other}`"))),
        },
        "pan" => ScriptCommand::Pan(num(0)?, num(1)?),
        "import" => {
            if rest.is_empty() {
                return Err(script_err(line_no, "`import` needs a path"));
            }
            ScriptCommand::Import(PathBuf::from(rest))
        }
        "font" => {
            if rest.is_empty() {
                return Err(script_err(line_no, "`font` needs a path"));
            }
            ScriptCommand::Font(PathBuf::from(rest))
        }
        "layer" => {
            let sub = args.first().map(|s| s.to_ascii_lowercase()).unwrap_or_default();
            // Text after the subcommand (and index, for rename) is a free-form name.
            let tail = |skip: usize| -> String {
                rest.split_whitespace().skip(skip).collect::<Vec<_>>().join(" ")
            };
            let layer = match sub.as_str() {
                "add" => {
                    let name = tail(1);
                    LayerCommand::Add((!name.is_empty()).then_some(name))
                }
                "remove" => LayerCommand::Remove(opt_index(1)?),
                "up" => LayerCommand::Up(opt_index(1)?),
                "down" => LayerCommand::Down(opt_index(1)?),
                "select" => LayerCommand::Select(index(1)?),
                "show" => LayerCommand::Show(index(1)?),
                "hide" => LayerCommand::Hide(index(1)?),
                "opacity" => LayerCommand::Opacity(index(1)?, num(2)?),
                "rename" => LayerCommand::Rename(index(1)?, tail(2)),
                "clear" => LayerCommand::Clear,
                other => return Err(script_err(line_no, format!("unknown layer command `{other}`"))),
            };
            ScriptCommand::Layer(layer)
        }
        other => return Err(script_err(line_no, format!("unknown command `{other}`"))),
    };
    Ok(Some(cmd))
}

/// Parse a whole script, stopping at the first bad line.
pub fn parse_script(source: &str) -> Result<Vec<(usize, ScriptCommand)>> {
    let mut commands = Vec::new();
    for (i, line) in source.lines().enumerate() {
        if let Some(cmd) = parse_line(i + 1, line)? {
            commands.push((i + 1, cmd));
        }
    }
    Ok(commands)
}

/// Run one command.  Relative import paths resolve against `base_dir`.
pub fn execute(session: &mut Session, line: usize, cmd: &ScriptCommand, base_dir: &Path) -> Result<()> {
    let current_tool = session.tools.tool;
    match cmd {
        ScriptCommand::Tool(tool) => session.set_tool(*tool),
        ScriptCommand::Color(c) => match session.tools.color_mut() {
            Some(slot) => *slot = *c,
            None => return Err(script_err(line, format!("tool `{current_tool}` has no color"))),
        },
        ScriptCommand::Size(v) => match session.tools.size_mut() {
            Some(slot) => *slot = v.max(0.0),
            None => return Err(script_err(line, format!("tool `{current_tool}` has no size"))),
        },
        ScriptCommand::Alpha(a) => session.tools.brush.alpha = a.clamp(0.0, 1.0),
        ScriptCommand::Mix(m) => session.tools.brush.mix = *m,
        ScriptCommand::Down(x, y) => session.pointer_down((*x, *y))?,
        ScriptCommand::Move(x, y) => session.pointer_move((*x, *y)),
        ScriptCommand::Up => session.pointer_up(),
        ScriptCommand::Leave => session.pointer_leave(),
        ScriptCommand::Fill { x, y, color } => {
            let (bx, by) = session.view.to_buffer((*x, *y));
            session.fill_at(bx.floor() as i64, by.floor() as i64, *color)?;
        }
        ScriptCommand::Text(text) => {
            if !session.commit_text(text)? {
                log_warn!("Line {}: no text entry open, `text` ignored", line);
            }
        }
        ScriptCommand::CancelText => session.cancel_text(),
        ScriptCommand::Layer(op) => {
            let active = session.canvas.active_layer_index;
            match op {
                LayerCommand::Add(name) => {
                    session.add_layer(name.as_deref());
                }
                LayerCommand::Remove(i) => {
                    session.remove_layer(i.unwrap_or(active));
                }
                LayerCommand::Up(i) => {
                    session.move_layer_up(i.unwrap_or(active));
                }
                LayerCommand::Down(i) => {
                    session.move_layer_down(i.unwrap_or(active));
                }
                LayerCommand::Select(i) => {
                    session.select_layer(*i);
                }
                LayerCommand::Show(i) => {
                    session.set_layer_visible(*i, true);
                }
                LayerCommand::Hide(i) => {
                    session.set_layer_visible(*i, false);
                }
                LayerCommand::Opacity(i, v) => {
                    session.set_layer_opacity(*i, *v);
                }
                LayerCommand::Rename(i, name) => {
                    session.rename_layer(*i, name);
                }
                LayerCommand::Clear => session.clear_active_layer(),
            }
        }
        ScriptCommand::Undo => {
            session.undo();
        }
        ScriptCommand::Redo => {
            session.redo();
        }
        ScriptCommand::ZoomIn => session.zoom_in(),
        ScriptCommand::ZoomOut => session.zoom_out(),
        ScriptCommand::ZoomReset => session.reset_view(),
        ScriptCommand::Pan(dx, dy) => session.pan_by(*dx, *dy),
        ScriptCommand::Import(path) => {
            let path = if path.is_relative() { base_dir.join(path) } else { path.clone() };
            session.import_image_file(&path)?;
        }
        ScriptCommand::Font(path) => {
            let path = if path.is_relative() { base_dir.join(path) } else { path.clone() };
            session.set_font(load_font_file(&path)?);
            log_info!("Line {}: using font {}", line, path.display());
        }
    }
    Ok(())
}

/// Parse and run `source` against `session`.  Execution errors are tagged
/// with their line number.
pub fn run_script(session: &mut Session, source: &str, base_dir: &Path) -> Result<usize> {
    let commands = parse_script(source)?;
    for (line, cmd) in &commands {
        execute(session, *line, cmd, base_dir).map_err(|e| match e {
            PaintError::Script { .. } => e,
            other => script_err(*line, other.to_string()),
        })?;
    }
    // A gesture left open at the end of the script is released.
    session.pointer_up();
    log_info!("Ran {} script commands", commands.len());
    Ok(commands.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn run(src: &str) -> Session {
        let mut s = Session::with_size(40, 40);
        run_script(&mut s, src, Path::new(".")).unwrap();
        s
    }

    #[test]
    fn parses_commands_and_skips_comments() {
        let cmds = parse_script("# header\n\ntool rect\ncolor #f00\nlayer rename 0 Paper sheet\nfill 1 2 #00ff00\n").unwrap();
        assert_eq!(
            cmds,
            vec![
                (3, ScriptCommand::Tool(Tool::Rectangle)),
                (4, ScriptCommand::Color(RED)),
                (5, ScriptCommand::Layer(LayerCommand::Rename(0, "Paper sheet".to_string()))),
                (6, ScriptCommand::Fill { x: 1.0, y: 2.0, color: Some(Rgba([0, 255, 0, 255])) }),
            ]
        );
    }

    #[test]
    fn parse_errors_carry_the_line_number() {
        let err = parse_script("tool brush\nsize big\n").unwrap_err();
        assert!(matches!(err, PaintError::Script { line: 2, .. }), "{err}");
        assert!(parse_line(1, "spin 3").is_err());
        assert!(parse_line(1, "layer twirl").is_err());
        assert!(parse_line(1, "down 1").is_err());
    }

    #[test]
    fn brush_stroke_then_undo() {
        let s = run("color #ff0000\nsize 1\ndown 10 10\nmove 20 20\nup\n");
        assert_eq!(*s.composite().get_pixel(15, 15), RED);
        let s = run("color #ff0000\nsize 1\ndown 10 10\nmove 20 20\nup\nundo\n");
        assert_eq!(*s.composite().get_pixel(15, 15), WHITE);
    }

    #[test]
    fn unreleased_gesture_is_committed_at_the_end() {
        let s = run("size 1\ndown 10 10\nmove 20 20\n");
        assert_eq!(s.history.len(), 2);
    }

    #[test]
    fn layers_and_fill() {
        let s = run("layer add Ink\nfill 5 5 #ff0000\nlayer hide 1\n");
        assert_eq!(s.canvas.layers.len(), 2);
        assert_eq!(s.canvas.layers[1].name, "Ink");
        assert_eq!(*s.canvas.layers[1].pixels.get_pixel(0, 0), RED);
        assert_eq!(*s.composite().get_pixel(0, 0), WHITE);
    }

    #[test]
    fn fill_outside_the_canvas_fails_with_its_line() {
        let mut s = Session::with_size(10, 10);
        let err = run_script(&mut s, "size 2\nfill 50 50\n", Path::new(".")).unwrap_err();
        assert!(matches!(err, PaintError::Script { line: 2, .. }), "{err}");
    }

    #[test]
    fn eraser_has_no_color() {
        let mut s = Session::with_size(10, 10);
        assert!(run_script(&mut s, "tool eraser\ncolor #000\n", Path::new(".")).is_err());
    }

    #[test]
    fn font_command_reports_unreadable_files_with_their_line() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.ttf"), b"not a font").unwrap();
        assert_eq!(
            parse_line(4, "font fonts/My Font.ttf").unwrap(),
            Some(ScriptCommand::Font(PathBuf::from("fonts/My Font.ttf")))
        );
        assert!(parse_line(1, "font").is_err());

        let mut s = Session::with_size(10, 10);
        let err = run_script(&mut s, "size 2\nfont broken.ttf\n", dir.path()).unwrap_err();
        assert!(matches!(err, PaintError::Script { line: 2, .. }), "{err}");
        let err = run_script(&mut s, "font missing.ttf\n", dir.path()).unwrap_err();
        assert!(matches!(err, PaintError::Script { line: 1, .. }), "{err}");
    }

    #[test]
    fn view_commands_change_the_transform() {
        let s = run("zoom in\npan 5 -3\n");
        assert!((s.view.zoom - 1.2).abs() < 1e-6);
        assert_eq!(s.view.pan, (5.0, -3.0));
    }
}
