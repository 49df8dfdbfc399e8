use crate::auth::AUTH_WAIT_URI;
use crate::error::{LensError, Result};
use crate::lens::{DisplayFields, Preview, SearchRequest, TaskLens};
use crate::models::ResultRow;
use crate::platform::{Browser, Clock};
use std::io::{self, BufRead, Write};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Search(String),
    Category(Option<String>),
    Order(String),
    Completed(bool),
    Fields(Vec<String>),
    Lists,
    Auth,
    Open(usize),
    Preview(usize),
    Quit,
}

/// Parses one input line. Plain text searches; `/name arg` runs a command.
pub fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Search(line.to_string()));
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "category" => match arg {
            "" => Err("usage: /category NAME|all".to_string()),
            "all" => Ok(Command::Category(None)),
            name => Ok(Command::Category(Some(name.to_string()))),
        },
        "order" if !arg.is_empty() => Ok(Command::Order(arg.to_string())),
        "order" => Err("usage: /order priority|due|name".to_string()),
        "completed" => match arg {
            "on" => Ok(Command::Completed(true)),
            "off" => Ok(Command::Completed(false)),
            _ => Err("usage: /completed on|off".to_string()),
        },
        "fields" => Ok(Command::Fields(
            arg.split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect(),
        )),
        "lists" => Ok(Command::Lists),
        "auth" => Ok(Command::Auth),
        "open" => parse_index(arg).map(Command::Open),
        "preview" => parse_index(arg).map(Command::Preview),
        "quit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command /{other}")),
    }
}

fn parse_index(arg: &str) -> std::result::Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("expected a result number, got {arg:?}")),
    }
}

/// Interactive front end over one session.
pub struct Shell<C: Clock, B: Browser> {
    lens: TaskLens<C, B>,
    request: SearchRequest,
    rows: Vec<ResultRow>,
}

impl<C: Clock, B: Browser> Shell<C, B> {
    pub fn new(lens: TaskLens<C, B>, request: SearchRequest) -> Self {
        Self {
            lens,
            request,
            rows: Vec::new(),
        }
    }

    pub fn run(&mut self, input: impl BufRead, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "Type to search, /quit to leave.")?;
        self.search(out)?;
        for line in input.lines() {
            let line = line?;
            match parse_command(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => self.execute(command, out)?,
                Err(message) => writeln!(out, "{message}")?,
            }
        }
        Ok(())
    }

    fn execute(&mut self, command: Command, out: &mut impl Write) -> io::Result<()> {
        match command {
            Command::Search(text) => {
                self.request.text = text;
                self.search(out)
            }
            Command::Category(category) => {
                self.request.category = category;
                self.search(out)
            }
            Command::Order(order) => {
                self.request.order = order;
                self.search(out)
            }
            Command::Completed(include) => {
                self.request.include_completed = include;
                self.search(out)
            }
            Command::Fields(fields) => {
                self.request.fields = DisplayFields::from_names(&fields);
                self.search(out)
            }
            Command::Lists => {
                for name in self.lens.category_names() {
                    writeln!(out, "  {name}")?;
                }
                Ok(())
            }
            Command::Auth => self.activate(AUTH_WAIT_URI.to_string(), out),
            Command::Open(n) => match self.row_uri(n) {
                Some(uri) => self.activate(uri, out),
                None => writeln!(out, "no result #{n}"),
            },
            Command::Preview(n) => {
                let Some(uri) = self.row_uri(n) else {
                    return writeln!(out, "no result #{n}");
                };
                match self.lens.preview(&uri) {
                    Ok(preview) => write_preview(out, &preview),
                    Err(err) => report(out, &err),
                }
            }
            Command::Quit => Ok(()),
        }
    }

    fn search(&mut self, out: &mut impl Write) -> io::Result<()> {
        self.rows.clear();
        let result = self.lens.search(&self.request, &mut self.rows);
        self.finish(result, out)
    }

    fn activate(&mut self, uri: String, out: &mut impl Write) -> io::Result<()> {
        match self.lens.handle_uri(&uri, &self.request, &mut self.rows) {
            Ok(()) if uri != AUTH_WAIT_URI => writeln!(out, "opened in browser"),
            result => self.finish(result, out),
        }
    }

    fn finish(&self, result: Result<()>, out: &mut impl Write) -> io::Result<()> {
        match result {
            Ok(()) => write_rows(out, &self.rows),
            Err(err) => report(out, &err),
        }
    }

    fn row_uri(&self, n: usize) -> Option<String> {
        self.rows.get(n.checked_sub(1)?).map(|row| row.uri.clone())
    }
}

fn report(out: &mut impl Write, err: &LensError) -> io::Result<()> {
    log::warn!("{err}");
    writeln!(out, "error: {err}")
}

pub fn write_rows(out: &mut impl Write, rows: &[ResultRow]) -> io::Result<()> {
    if rows.is_empty() {
        return writeln!(out, "(no tasks)");
    }
    for (index, row) in rows.iter().enumerate() {
        if row.subtitle.trim().is_empty() {
            writeln!(out, "{:>3}. {}", index + 1, row.title)?;
        } else {
            writeln!(out, "{:>3}. {}  ({})", index + 1, row.title, row.subtitle.trim())?;
        }
    }
    Ok(())
}

pub fn write_preview(out: &mut impl Write, preview: &Preview) -> io::Result<()> {
    writeln!(out, "{}", preview.subtitle)?;
    if !preview.title.is_empty() {
        writeln!(out, "{}", preview.title)?;
    }
    writeln!(out)?;
    writeln!(out, "{}", strip_markup(&preview.description))
}

/// Drops the `<b>`/`<i>` tags used in preview text.
fn strip_markup(text: &str) -> String {
    ["<b>", "</b>", "<i>", "</i>"]
        .iter()
        .fold(text.to_string(), |acc, tag| acc.replace(tag, ""))
}
