use clap::Parser;
use tictac_client::{Client, ClientError, GameObserver, GameView, LobbyObserver};
use tictac_protocol::{GameId, GameStatus, MessageKind, Symbol};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Terminal client for a tictac server.
#[derive(Parser, Debug)]
#[command(name = "tictac-client", version, about)]
struct Args {
    /// Nickname to play as
    nickname: String,
    /// Server port
    port: u16,
    /// Server host name or address
    host: String,
}

const HELP: &str = "\
commands:
  list                  show the lobby
  challenge <nick>      send a game request
  accept <id>           accept a game request
  decline <id>          decline a game request
  move <id> <x> <y>     place your symbol (x, y in 0..=2)
  forfeit <id>          give up a running game
  board <id>            show a game's board
  quit                  leave";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Command {
    List,
    Challenge(String),
    Respond(GameId, bool),
    Move(GameId, i32, i32),
    Forfeit(GameId),
    Board(GameId),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("empty command".into());
    };
    let args: Vec<&str> = words.collect();

    let int = |s: &str| s.parse::<i32>().map_err(|_| format!("not a number: {s}"));
    let command = match (verb, args.as_slice()) {
        ("list", []) => Command::List,
        ("challenge", [nick]) => Command::Challenge((*nick).to_string()),
        ("accept", [id]) => Command::Respond(GameId(int(*id)?), true),
        ("decline", [id]) => Command::Respond(GameId(int(*id)?), false),
        ("move", [id, x, y]) => Command::Move(GameId(int(*id)?), int(*x)?, int(*y)?),
        ("forfeit", [id]) => Command::Forfeit(GameId(int(*id)?)),
        ("board", [id]) => Command::Board(GameId(int(*id)?)),
        ("help", []) => Command::Help,
        ("quit", []) => Command::Quit,
        _ => return Err(format!("unrecognised command: {line}")),
    };
    Ok(command)
}

/// Runs one command. Returns `false` when the user asked to quit.
fn execute(client: &mut Client, command: Command) -> Result<bool, ClientError> {
    match command {
        Command::List => {
            let lobby = client.mirror().lobby();
            if lobby.is_empty() {
                println!("lobby is empty");
            }
            for (nickname, score) in lobby.players() {
                println!("  {nickname:<20} {score}");
            }
        }
        Command::Challenge(nickname) => client.challenge(&nickname)?,
        Command::Respond(game_id, accept) => client.respond(game_id, accept)?,
        Command::Move(game_id, x, y) => client.make_move(game_id, x, y)?,
        Command::Forfeit(game_id) => client.forfeit(game_id)?,
        Command::Board(game_id) => {
            let view = client
                .mirror()
                .game(game_id)
                .ok_or(ClientError::UnknownGame(game_id))?;
            println!(
                "game {} vs {} (you are {}, they are {}), {}",
                game_id.0,
                view.opponent(),
                view.symbol().as_char(),
                view.opponent_symbol().as_char(),
                if view.may_move() { "your move" } else { "waiting" }
            );
            print!("{}", view.board().render());
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// Console output
// ---------------------------------------------------------------------------

struct Console;

fn print_message(body: &str, title: &str, kind: MessageKind) {
    if kind.is_status_line() {
        println!("-- {body}");
    } else {
        println!("[{title}] {body}");
    }
}

impl LobbyObserver for Console {
    fn player_entered(&mut self, nickname: &str, score: i32) {
        println!("{nickname} is in the lobby (score {score})");
    }

    fn player_left(&mut self, nickname: &str) {
        println!("{nickname} left");
    }

    fn request_sent(&mut self, game_id: GameId, nickname: &str) {
        if game_id.is_none() {
            println!("there is no player called {nickname}");
        } else {
            println!("challenged {nickname} (game {})", game_id.0);
        }
    }

    fn request_received(&mut self, game_id: GameId, from: &str) {
        println!(
            "{from} challenges you: `accept {id}` or `decline {id}`",
            id = game_id.0
        );
    }

    fn game_started(&mut self, game: &GameView) {
        println!(
            "game {} against {} started, you are {}",
            game.id().0,
            game.opponent(),
            game.symbol().as_char()
        );
    }

    fn message_received(&mut self, body: &str, title: &str, kind: MessageKind) {
        print_message(body, title, kind);
    }
}

impl GameObserver for Console {
    fn tile_changed(&mut self, game_id: GameId, x: i32, y: i32, symbol: Symbol) {
        println!("game {}: {} at ({x}, {y})", game_id.0, symbol.as_char());
    }

    fn state_changed(&mut self, game_id: GameId, status: GameStatus, can_move: bool) {
        match status {
            GameStatus::InProgress if can_move => println!("game {}: your move", game_id.0),
            GameStatus::InProgress => {}
            _ => println!("game {}: {status}", game_id.0),
        }
    }

    fn message_received(&mut self, game_id: GameId, body: &str, title: &str, kind: MessageKind) {
        print!("game {}: ", game_id.0);
        print_message(body, title, kind);
    }
}

// ---------------------------------------------------------------------------
// Main loop
// ---------------------------------------------------------------------------

enum Input {
    Server(Option<tictac_protocol::ServerMessage>),
    Line(std::io::Result<Option<String>>),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let mut client = Client::connect(&format!("{}:{}", args.host, args.port), &args.nickname).await?;
    if client.was_renamed() {
        println!(
            "{} is taken, you are playing as {}",
            args.nickname,
            client.nickname()
        );
    } else {
        println!("connected as {}", client.nickname());
    }
    client.mirror_mut().add_lobby_observer(Box::new(Console));
    client.mirror_mut().add_game_observer(Box::new(Console));
    client.request_players()?;
    println!("type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let input = tokio::select! {
            message = client.recv() => Input::Server(message),
            line = lines.next_line() => Input::Line(line),
        };

        match input {
            Input::Server(Some(_)) => {}
            Input::Server(None) => {
                println!("disconnected from server");
                return Ok(());
            }
            Input::Line(Ok(Some(line))) => {
                if line.trim().is_empty() {
                    continue;
                }
                let keep_going = match parse_command(&line) {
                    Ok(command) => match execute(&mut client, command) {
                        Ok(keep_going) => keep_going,
                        Err(e) => {
                            println!("{e}");
                            true
                        }
                    },
                    Err(e) => {
                        println!("{e}");
                        true
                    }
                };
                if !keep_going {
                    break;
                }
            }
            Input::Line(Ok(None)) => break,
            Input::Line(Err(e)) => return Err(e.into()),
        }
    }

    client.close().await?;
    Ok(())
}
