//! Local command REPL (A4): gated by `Config::start_cli`, reads whitespace-
//! split lines from stdin and parses each with `clap`'s derive parser.

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::peer::Peer;

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
enum Command {
    /// List a directory's entries.
    Ls { path: String },
    /// Print a file's contents.
    Cat { path: String },
    /// Print a path's attributes.
    Stat { path: String },
    /// Print filesystem statistics.
    Statfs,
    /// Quit the REPL.
    Quit,
}

pub struct Repl {
    peer: Arc<Peer>,
}

impl Repl {
    pub fn new(peer: Arc<Peer>) -> Self {
        Self { peer }
    }

    /// Runs until `quit` is typed or stdin closes.
    pub async fn run(&self) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(error) => {
                    println!("error reading stdin: {error}");
                    break;
                }
            };
            let words = line.split_whitespace();
            match Command::try_parse_from(words) {
                Ok(Command::Ls { path }) => self.ls(&path).await,
                Ok(Command::Cat { path }) => self.cat(&path).await,
                Ok(Command::Stat { path }) => self.stat(&path).await,
                Ok(Command::Statfs) => self.statfs().await,
                Ok(Command::Quit) => break,
                Err(error) => println!("{error}"),
            }
        }
    }

    async fn ls(&self, path: &str) {
        match self.peer.adapter.readdir(path).await {
            Ok(entries) => {
                for entry in entries {
                    println!("{}", entry.name);
                }
            }
            Err(error) => println!("ls: {error}"),
        }
    }

    async fn cat(&self, path: &str) {
        if let Err(error) = self.peer.adapter.open(path).await {
            println!("cat: {error}");
            return;
        }
        match self.peer.adapter.read(path, 0, usize::MAX / 2).await {
            Ok(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
            Err(error) => println!("cat: {error}"),
        }
    }

    async fn stat(&self, path: &str) {
        match self.peer.adapter.getattr(path).await {
            Ok(attr) => println!("{:?} size={}", attr.file_type, attr.size),
            Err(error) => println!("stat: {error}"),
        }
    }

    async fn statfs(&self) {
        let info = self.peer.adapter.statfs().await;
        println!(
            "bsize={} blocks={} bfree={} files={} ffree={}",
            info.bsize, info.blocks, info.bfree, info.files, info.ffree
        );
    }
}
