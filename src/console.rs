//! Line-driven terminal front end. Renders effects as text and turns typed
//! commands into session events; owns no experiment state of its own.

use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::ExperimentConfig;
use crate::error::SessionError;
use crate::export::DEFAULT_FILE_NAME;
use crate::grid::RandomGrid;
use crate::models::{BlockSurvey, FinalSurvey, YearOfStudy};
use crate::session::{Direction, Effect, Event, RandomShuffler, Session, SessionController};
use crate::utils::{format_amount, SystemClock};

const HELP: &str = "\
commands:
  start                      give consent and start the session
  begin                      start the next block
  <number>                   submit your zero count
  stop                       end the current block early
  out | in                   simulate leaving / returning to the tab
  survey <sat> <bore> [recall]
  final <importance> <distraction> <age> <gender> <major> <year|other:detail>
  status                     show session state
  export [path]              write the CSV log
  help | quit";

const STOP_WARNING: &str =
    "If you stop now, you will not be able to return to this session. There is no penalty for stopping. Stop? [y/N]";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(Event),
    Stop,
    Status,
    Export(Option<PathBuf>),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(Command::Send(Event::SubmitAnswer {
            input: String::new(),
        }));
    };
    let args: Vec<&str> = parts.collect();

    let command = match head.to_ascii_lowercase().as_str() {
        "start" => Command::Send(Event::Start { consent: true }),
        "begin" => Command::Send(Event::BeginBlock),
        "stop" => Command::Stop,
        "out" => Command::Send(Event::Visibility {
            direction: Direction::Out,
        }),
        "in" => Command::Send(Event::Visibility {
            direction: Direction::In,
        }),
        "survey" => Command::Send(Event::SubmitBlockSurvey {
            survey: parse_block_survey(&args)?,
        }),
        "final" => Command::Send(Event::SubmitFinalSurvey {
            survey: parse_final_survey(&args)?,
        }),
        "status" => Command::Status,
        "export" => Command::Export(args.first().map(PathBuf::from)),
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Send(Event::SubmitAnswer {
            input: line.trim().to_string(),
        }),
    };
    Ok(command)
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: Option<&&str>) -> Result<T, String> {
    let raw = raw.ok_or_else(|| format!("missing {name}"))?;
    raw.parse()
        .map_err(|_| format!("{name} must be a number, got {raw:?}"))
}

fn parse_block_survey(args: &[&str]) -> Result<BlockSurvey, String> {
    Ok(BlockSurvey {
        satisfaction: parse_number("satisfaction", args.first())?,
        boredom: parse_number("boredom", args.get(1))?,
        recall: match args.get(2) {
            Some(_) => Some(parse_number("recall", args.get(2))?),
            None => None,
        },
    })
}

fn parse_final_survey(args: &[&str]) -> Result<FinalSurvey, String> {
    if args.len() < 6 {
        return Err(
            "usage: final <importance> <distraction> <age> <gender> <major> <year|other:detail>"
                .into(),
        );
    }
    let year = args[5..].join(" ");
    let year_of_study = match year.split_once(':') {
        Some((kind, detail)) if kind.eq_ignore_ascii_case("other") => {
            YearOfStudy::Other(detail.trim().to_string())
        }
        _ => YearOfStudy::Year(year),
    };

    Ok(FinalSurvey {
        importance: parse_number("importance", args.first())?,
        distraction: parse_number("distraction", args.get(1))?,
        age: parse_number("age", args.get(2))?,
        gender: args[3].to_string(),
        major: args[4].to_string(),
        year_of_study,
    })
}

/// Text for an effect, or `None` for effects the terminal has no use for.
pub fn render(effect: &Effect) -> Option<String> {
    match effect {
        Effect::ShowBlockIntro {
            block_number,
            comparison_text,
        } => {
            let mut text = format!("=== SESSION {block_number} ===");
            if let Some(comparison) = comparison_text {
                text.push('\n');
                text.push_str(comparison);
            }
            text.push_str("\n(type `begin` when ready)");
            Some(text)
        }
        Effect::ShowTask { block_number } => {
            Some(format!("Block {block_number}: count the zeros in each grid."))
        }
        Effect::RenderGrid { grid } => Some(
            grid.rows()
                .map(|row| {
                    row.iter()
                        .map(u8::to_string)
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Effect::EarningsChanged { block_earnings } => {
            Some(format!("Earnings this block: {}", format_amount(*block_earnings)))
        }
        Effect::TimerUpdated { remaining_secs } if remaining_secs % 60 == 0 => Some(format!(
            "Time left: {:02}:{:02}",
            remaining_secs / 60,
            remaining_secs % 60
        )),
        Effect::TimeUp => Some("Time is up! Please complete the survey.".into()),
        Effect::ShowBlockSurvey {
            block_number,
            recall_required,
        } => Some(if *recall_required {
            format!("Survey for block {block_number}: survey <satisfaction> <boredom> <recall>")
        } else {
            format!("Survey for block {block_number}: survey <satisfaction> <boredom>")
        }),
        Effect::ShowFinalSurvey => Some(
            "Final survey: final <importance> <distraction> <age> <gender> <major> <year|other:detail>"
                .into(),
        ),
        Effect::ShowComplete { total_earnings } => Some(format!(
            "Thank you! Total earnings: {}. Type `export` to save the data.",
            format_amount(*total_earnings)
        )),
        Effect::ArmTimer { .. } | Effect::CancelTimer | Effect::TimerUpdated { .. } => None,
    }
}

fn report(err: &SessionError) {
    if err.is_recoverable() {
        println!("{err}");
    } else {
        println!("{err} (type `status` to see where the session is)");
    }
}

pub async fn run_console(config: ExperimentConfig) -> Result<()> {
    let session = Session::new(
        config,
        Box::new(RandomShuffler),
        Box::new(RandomGrid),
        Box::new(SystemClock),
    )?;
    let (controller, mut effects_rx) = SessionController::new(session);

    let printer = tokio::spawn(async move {
        while let Some(effect) = effects_rx.recv().await {
            if let Some(text) = render(&effect) {
                println!("{text}");
            }
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Status => {
                let snapshot = controller.snapshot().await;
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            Command::Export(path) => {
                let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME));
                match controller.export_csv(&path).await {
                    Ok(rows) => println!("wrote {rows} rows to {}", path.display()),
                    Err(err) => println!("export failed: {err:#}"),
                }
            }
            Command::Stop => {
                println!("{STOP_WARNING}");
                let confirmed = lines
                    .next_line()
                    .await?
                    .is_some_and(|answer| answer.trim().eq_ignore_ascii_case("y"));
                if confirmed {
                    if let Err(err) = controller.dispatch(Event::StopEarly).await {
                        report(&err);
                    }
                }
            }
            Command::Send(event) => {
                if let Err(err) = controller.dispatch(event).await {
                    report(&err);
                }
            }
        }
    }

    controller.shutdown().await?;
    drop(controller);
    let _ = printer.await;
    Ok(())
}
