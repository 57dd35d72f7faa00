//! PGN emitter (C6, spec §4.6): renders an `AnnotatedGame` back out as
//! PGN text — tag-pair block in canonical order, per-move comments,
//! move text wrapped at 80 columns.

use crate::analyzer::{AnnotatedGame, Classification, MoveAnnotation};
use crate::uci::Score;

/// The Seven Tag Roster, in the fixed order spec §4.6 requires.
const ROSTER: [&str; 7] = ["Event", "Site", "Date", "Round", "White", "Black", "Result"];

/// Tag names this tool itself produces; original tags under these
/// names are never echoed back in the generic "other tags" section
/// (spec §4.6).
const PRODUCED: [&str; 19] = [
    "Analyzer",
    "Annotator",
    "ECO",
    "Variation",
    "Scid-ECO",
    "White-Moves",
    "Black-Moves",
    "White-Forced-Moves",
    "Black-Forced-Moves",
    "White-Errors",
    "Black-Errors",
    "White-Blunders",
    "Black-Blunders",
    "White-Errors-Per-Move",
    "Black-Errors-Per-Move",
    "White-Blunders-Per-Move",
    "Black-Blunders-Per-Move",
    "White-Loss-Per-Move",
    "Black-Loss-Per-Move",
    "Game",
];

const MAX_WIDTH: usize = 80;

pub fn render(game: &AnnotatedGame) -> String {
    let mut out = String::new();
    render_tags(game, &mut out);
    out.push('\n');
    out.push_str(&wrap_movetext(&build_movetext(game)));
    out.push('\n');
    out
}

fn render_tags(game: &AnnotatedGame, out: &mut String) {
    let result = game
        .terminal
        .map(|t| t.result_tag().to_string())
        .or_else(|| game.tag("Result").map(str::to_string))
        .unwrap_or_else(|| "*".to_string());

    for &name in &ROSTER {
        let value = if name == "Result" {
            result.clone()
        } else {
            default_for(name, game.tag(name))
        };
        push_tag(out, name, &value);
    }

    let mut others: Vec<&(String, String)> =
        game.tags.iter().filter(|(k, _)| !is_reserved(k)).collect();
    others.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in others {
        push_tag(out, name, value);
    }

    push_tag(out, "Annotator", "annotate 0.1.0");
    if let Some(engine) = &game.engine_name {
        push_tag(out, "Analyzer", engine);
    }
    if let Some(eco) = &game.eco {
        push_tag(out, "ECO", &eco.code);
        push_tag(out, "Variation", &eco.variation);
        if let Some(alt) = &eco.alt_code {
            push_tag(out, "Scid-ECO", alt);
        }
    }

    push_tag(out, "White-Moves", &game.white.moves.to_string());
    push_tag(out, "Black-Moves", &game.black.moves.to_string());
    push_tag(out, "White-Forced-Moves", &game.white.forced_moves.to_string());
    push_tag(out, "Black-Forced-Moves", &game.black.forced_moves.to_string());
    push_tag(out, "White-Errors", &game.white.errors.to_string());
    push_tag(out, "Black-Errors", &game.black.errors.to_string());
    push_tag(out, "White-Blunders", &game.white.blunders.to_string());
    push_tag(out, "Black-Blunders", &game.black.blunders.to_string());
    push_tag(out, "White-Errors-Per-Move", &format!("{:.3}", game.white.errors_per_move()));
    push_tag(out, "Black-Errors-Per-Move", &format!("{:.3}", game.black.errors_per_move()));
    push_tag(out, "White-Blunders-Per-Move", &format!("{:.3}", game.white.blunders_per_move()));
    push_tag(out, "Black-Blunders-Per-Move", &format!("{:.3}", game.black.blunders_per_move()));
    push_tag(out, "White-Loss-Per-Move", &format!("{:.2}", game.white.loss_per_move()));
    push_tag(out, "Black-Loss-Per-Move", &format!("{:.2}", game.black.loss_per_move()));
    push_tag(out, "Game", &game.game_number.to_string());
}

fn is_reserved(name: &str) -> bool {
    ROSTER.contains(&name) || PRODUCED.contains(&name)
}

fn default_for(name: &str, value: Option<&str>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => match name {
            "Date" => "????.??.??".to_string(),
            _ => "?".to_string(),
        },
    }
}

fn push_tag(out: &mut String, name: &str, value: &str) {
    out.push('[');
    out.push_str(&escape_tag_name(name));
    out.push_str(" \"");
    out.push_str(&escape_tag_value(value));
    out.push_str("\"]\n");
}

fn escape_tag_name(name: &str) -> String {
    name.replace('\\', "\\\\").replace(']', "\\]")
}

fn escape_tag_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Build the unwrapped move text: `N. san[comment] san[comment] …
/// result` (spec §4.6 "Move-text rendering").
fn build_movetext(game: &AnnotatedGame) -> String {
    let mut tokens: Vec<String> = Vec::with_capacity(game.moves.len() * 2);
    for annotation in &game.moves {
        let fullmove = annotation.fullmove;
        let comment = build_comment(annotation);
        let piece = format!("{}{comment}", annotation.played_san);
        if annotation.color == shakmaty::Color::White {
            tokens.push(format!("{fullmove}. {piece}"));
        } else if annotation.ply == 0 {
            // Game's main line starts mid-move (custom FEN, Black to move).
            tokens.push(format!("{fullmove}. ... {piece}"));
        } else {
            tokens.push(piece);
        }
    }

    let result = game
        .terminal
        .map(|t| t.result_tag().to_string())
        .or_else(|| game.tag("Result").map(str::to_string))
        .unwrap_or_else(|| "*".to_string());
    tokens.push(result);
    tokens.join(" ")
}

/// Build one move's inline comment: `{ (score) }` when the player
/// matched the engine, `{ (played/best) Error!|Blunder! Better: X }`
/// followed by `(numbered pv)` when they deviated, plus a trailing
/// terminal-state reason on the game's last half-move (spec §4.6).
fn build_comment(annotation: &MoveAnnotation) -> String {
    let mut out = String::new();
    out.push_str(" { ");

    if annotation.deviates {
        let played = annotation.played_score.map(format_score).unwrap_or_else(|| "?".to_string());
        let best = annotation.best_score.map(format_score).unwrap_or_else(|| "?".to_string());
        out.push_str(&format!("({played}/{best})"));
        match annotation.classification {
            Classification::Blunder => out.push_str(" Blunder!"),
            Classification::Error => out.push_str(" Error!"),
            Classification::Ok => {}
        }
        if let Some(best_san) = &annotation.best_san {
            out.push_str(&format!(" Better: {best_san}"));
        }
    } else if let Some(score) = annotation.played_score.or(annotation.best_score) {
        out.push_str(&format!("({})", format_score(score)));
    } else {
        out.push('-');
    }

    if let Some(reason) = annotation.terminal_reason {
        out.push_str(&format!(". {reason}"));
    }

    out.push_str(" }");

    if annotation.deviates {
        if let Some(pv) = &annotation.pv {
            if !pv.is_empty() {
                out.push_str(&format!(" ({})", pv.join(" ")));
            }
        }
    }

    out
}

fn format_score(score: Score) -> String {
    match score {
        Score::Cp(cp) => format!("{:+.2}", cp as f64 / 100.0),
        Score::Mate(n) if n >= 0 => format!("#{n}"),
        Score::Mate(n) => format!("-#{}", -n),
    }
}

/// Wrap `text` at ≤80 columns, breaking only at a whitespace that is
/// not immediately preceded by a `.` (so move-number dots stay glued
/// to their numerals), per spec §4.6/§8.
fn wrap_movetext(text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    let mut col = 0usize;
    let mut last_break: Option<usize> = None;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == ' ' {
            let preceded_by_dot = i > 0 && chars[i - 1] == '.';
            if !preceded_by_dot {
                last_break = Some(i);
            }
        }
        col += 1;
        if col >= MAX_WIDTH {
            if let Some(pos) = last_break {
                chars[pos] = '\n';
                col = i - pos;
                last_break = None;
            }
        }
        i += 1;
    }

    chars.into_iter().collect()
}

impl AnnotatedGame {
    fn tag(&self, name: &str) -> Option<&str> {
        self.tags.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Evaluation;
    use crate::terminal::TerminalState;
    use pretty_assertions::assert_eq;

    fn base_game() -> AnnotatedGame {
        AnnotatedGame {
            tags: vec![
                ("Event".into(), "Casual Game".into()),
                ("White".into(), "Alice".into()),
                ("Black".into(), "Bob".into()),
                ("Result".into(), "*".into()),
                ("Annotator".into(), "someone else".into()),
            ],
            moves: vec![],
            white: Evaluation::default(),
            black: Evaluation::default(),
            eco: None,
            terminal: None,
            engine_name: Some("Stockfish 16".into()),
            game_number: 1,
        }
    }

    #[test]
    fn roster_comes_first_in_order() {
        let game = base_game();
        let rendered = render(&game);
        let lines: Vec<&str> = rendered.lines().take(7).collect();
        assert_eq!(lines[0], "[Event \"Casual Game\"]");
        assert_eq!(lines[1], "[Site \"?\"]");
        assert_eq!(lines[2], "[Date \"????.??.??\"]");
        assert_eq!(lines[3], "[Round \"?\"]");
        assert_eq!(lines[4], "[White \"Alice\"]");
        assert_eq!(lines[5], "[Black \"Bob\"]");
        assert_eq!(lines[6], "[Result \"*\"]");
    }

    #[test]
    fn tool_produced_tags_never_duplicate_originals() {
        let game = base_game();
        let rendered = render(&game);
        assert_eq!(rendered.matches("[Annotator ").count(), 1);
        assert!(rendered.contains("[Annotator \"annotate 0.1.0\"]"));
    }

    #[test]
    fn terminal_state_overrides_result() {
        let mut game = base_game();
        game.terminal = Some(TerminalState::WhiteMates);
        let rendered = render(&game);
        assert!(rendered.contains("[Result \"1-0\"]"));
    }

    #[test]
    fn escapes_quotes_and_backslashes_in_values() {
        let mut game = base_game();
        game.tags.push(("Site".into(), "Some \"Club\" \\ City".into()));
        let rendered = render(&game);
        assert!(rendered.contains("[Site \"Some \\\"Club\\\" \\\\ City\"]"));
    }

    #[test]
    fn wrapper_keeps_move_number_dots_glued() {
        let long_move_text = (1..=40)
            .map(|n| format!("{n}. e4 e5"))
            .collect::<Vec<_>>()
            .join(" ");
        let wrapped = wrap_movetext(&long_move_text);
        for line in wrapped.lines() {
            assert!(line.chars().count() <= MAX_WIDTH);
        }
        assert!(!wrapped.contains(".\n"));
    }
}
