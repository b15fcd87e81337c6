//! Interactive review loop over stdin.

use std::{io::Write as _, path::PathBuf};

use anyhow::{Context, Result};
use client_core::{CancelHandle, Dispatch, StateTag, WorkflowController};
use shared::domain::CardField;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{interruptible, render::render, upload::read_pdf};

const HELP: &str = "\
commands:
  load <path>                upload a PDF
  show                       print the cards
  edit <n>                   open or close the editor for card n
  front <text> | back <text> change the open card
  set <n> front|back <text>  change a side of card n
  delete <n>                 remove card n
  name <text>                rename the deck
  download                   build and save the deck
  reset                      start over with a different PDF
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Help,
    Show,
    Load(PathBuf),
    Delete(usize),
    Edit(usize),
    SetFocused { field: CardField, value: String },
    Set {
        index: usize,
        field: CardField,
        value: String,
    },
    Name(String),
    Download,
    Reset,
    Quit,
}

pub async fn run(controller: &mut WorkflowController, pdf: Option<PathBuf>) -> Result<()> {
    let cancel = controller.cancel_handle();
    println!("{HELP}");
    if let Some(path) = pdf {
        execute(controller, &cancel, ReplCommand::Load(path)).await;
    } else {
        print!("{}", render(controller.session()));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("failed to flush stdout")?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read input")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_command(&line) {
            Ok(Some(ReplCommand::Quit)) => break,
            Ok(Some(command)) => execute(controller, &cancel, command).await,
            Ok(None) => {}
            Err(message) => println!("{message}"),
        }
    }
    Ok(())
}

async fn execute(controller: &mut WorkflowController, cancel: &CancelHandle, command: ReplCommand) {
    let dispatch = match command {
        ReplCommand::Help => {
            println!("{HELP}");
            return;
        }
        ReplCommand::Quit => return,
        ReplCommand::Show => Dispatch::Applied,
        ReplCommand::Load(path) => {
            if controller.session().state() == StateTag::Preview {
                println!("Use `reset` to upload a different PDF.");
                return;
            }
            match read_pdf(&path).await {
                Ok(upload) => interruptible(cancel, controller.select_file(upload)).await,
                Err(err) => {
                    println!("{err:#}");
                    return;
                }
            }
        }
        ReplCommand::Delete(index) => controller.delete_card(index),
        ReplCommand::Edit(index) => controller.toggle_edit(index),
        ReplCommand::SetFocused { field, value } => match controller.session().edit_focus() {
            Some(index) => controller.edit_card(index, field, value),
            None => {
                println!("Open a card with `edit <n>` first.");
                return;
            }
        },
        ReplCommand::Set {
            index,
            field,
            value,
        } => controller.edit_card(index, field, value),
        ReplCommand::Name(name) => controller.rename_deck(name),
        ReplCommand::Download => interruptible(cancel, controller.download()).await,
        ReplCommand::Reset => controller.reset(),
    };

    if dispatch == Dispatch::Ignored {
        println!("Not available while {}.", controller.session().state());
        return;
    }
    print!("{}", render(controller.session()));
}

fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim_start();
    if line.trim().is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest),
        None => (line.trim_end(), ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "help" | "?" => ReplCommand::Help,
        "show" | "list" | "ls" => ReplCommand::Show,
        "load" | "open" => {
            let path = rest.trim();
            if path.is_empty() {
                return Err("usage: load <path>".to_string());
            }
            ReplCommand::Load(PathBuf::from(path))
        }
        "delete" | "del" | "rm" => ReplCommand::Delete(parse_card_number(rest)?),
        "edit" => ReplCommand::Edit(parse_card_number(rest)?),
        "front" => ReplCommand::SetFocused {
            field: CardField::Front,
            value: rest.to_string(),
        },
        "back" => ReplCommand::SetFocused {
            field: CardField::Back,
            value: rest.to_string(),
        },
        "set" => {
            let mut parts = rest.trim_start().splitn(3, char::is_whitespace);
            let number = parts.next().unwrap_or_default();
            let field = parts
                .next()
                .ok_or_else(|| "usage: set <n> front|back <text>".to_string())?
                .parse::<CardField>()?;
            let value = parts.next().unwrap_or_default().to_string();
            ReplCommand::Set {
                index: parse_card_number(number)?,
                field,
                value,
            }
        }
        "name" | "rename" => ReplCommand::Name(rest.to_string()),
        "download" | "save" => ReplCommand::Download,
        "reset" | "new" => ReplCommand::Reset,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        other => return Err(format!("unknown command '{other}' (try `help`)")),
    };
    Ok(Some(command))
}

/// Card numbers on screen start at 1.
fn parse_card_number(raw: &str) -> Result<usize, String> {
    let raw = raw.trim().trim_start_matches('#');
    let number: usize = raw
        .parse()
        .map_err(|_| format!("expected a card number, got '{raw}'"))?;
    number
        .checked_sub(1)
        .ok_or_else(|| "card numbers start at 1".to_string())
}
