use std::path::{Path, PathBuf};

use anyhow::anyhow;
use clap::Parser;
use gemchat::App;
use gemchat::chat::{ChatView, Draft, ImageAttachment, LoadOutcome, ViewEvent};
use gemchat::dashboard::{Route, Sidebar};
use gemchat::models::{ChatroomId, Message, Sender};
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "gemchat", version, about = "Chat with a simulated assistant")]
struct Args {
    /// Directory holding the local database.
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Keep everything in memory.
    #[arg(long)]
    memory: bool,
}

const HELP: &str = "\
commands:
  /login <country-code> <number>   send a one-time code
  /otp <code>                      verify the code and sign in
  /logout
  /new                             create a chatroom
  /list                            list chatrooms
  /search [text]                   filter the list by title
  /open <n|id>                     open a chatroom
  /older                           load older messages
  /image <path>                    attach an image to the next message
  /delete <n|id>                   delete a chatroom
  /quit
anything else is sent to the open chatroom";

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing (optional, controlled via RUST_LOG)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemchat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    let args = Args::parse();
    let app = if args.memory {
        App::in_memory().await?
    } else {
        let data_dir = match args.data_dir {
            Some(v) => v,
            None => dirs::data_dir()
                .ok_or(anyhow!("Cannot determine data directory"))?
                .join(gemchat::DATA_DIR_NAME),
        };
        App::open(&data_dir).await?
    };
    Shell::new(app).run().await
}

struct Shell {
    app: App,
    sidebar: Sidebar,
    pending_phone: Option<String>,
    attachment: Option<ImageAttachment>,
    view: Option<ChatView>,
}

impl Shell {
    fn new(app: App) -> Self {
        let sidebar = app.sidebar();
        Self {
            app,
            sidebar,
            pending_phone: None,
            attachment: None,
            view: None,
        }
    }

    async fn run(mut self) -> Result<(), anyhow::Error> {
        println!("Gemini Chat. Type /help for commands.");
        self.show_route().await;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "/quit" {
                break;
            }
            if let Err(err) = self.handle(line).await {
                println!("! {err}");
            }
        }
        Ok(())
    }

    async fn show_route(&self) {
        match self.app.resolve(Route::Dashboard).await {
            Route::Entry => println!("Sign in with /login <country-code> <number>"),
            _ => {
                let phone = self.app.auth().phone_number().await.unwrap_or_default();
                println!("Signed in as {phone}");
            }
        }
    }

    async fn handle(&mut self, line: &str) -> Result<(), anyhow::Error> {
        let (command, rest) = match line.split_once(' ') {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };
        let signed_in = self.app.auth().is_authenticated().await;
        match command {
            "/help" => println!("{HELP}"),
            "/login" => {
                let (code, number) = rest.split_once(' ').unwrap_or((rest, ""));
                let phone = self.app.otp_flow().send_otp(code, number).await?;
                println!("OTP sent to {phone}. Any 6-digit code will work.");
                self.pending_phone = Some(phone);
            }
            "/otp" => {
                let phone = self
                    .pending_phone
                    .clone()
                    .ok_or(anyhow!("Request a code with /login first"))?;
                self.app.otp_flow().verify_otp(&phone, rest).await?;
                self.pending_phone = None;
                println!("Login successful!");
            }
            _ if !signed_in => {
                println!("Sign in with /login <country-code> <number>");
            }
            "/logout" => {
                self.view = None;
                self.sidebar.logout().await?;
                println!("Logged out successfully!");
            }
            "/new" => {
                let id = self.sidebar.new_chat().await?;
                println!("Chatroom created!");
                self.open(&id).await?;
            }
            "/list" => self.list().await,
            "/search" => {
                self.sidebar.set_query(rest);
                tokio::time::sleep(self.app.config().search_debounce()).await;
                tokio::task::yield_now().await;
                self.list().await;
            }
            "/open" => {
                let id = self.lookup(rest).await?;
                self.open(&id).await?;
            }
            "/delete" => {
                let id = self.lookup(rest).await?;
                if self.view.as_ref().map(|v| v.chatroom_id() == &id).unwrap_or(false) {
                    self.view = None;
                }
                self.sidebar.delete_chat(&id).await?;
                println!("Chatroom deleted!");
            }
            "/older" => self.older().await?,
            "/image" => {
                let max = self.app.config().max_image_bytes;
                let image = ImageAttachment::from_path(Path::new(rest), max).await?;
                println!("Image ready to send!");
                self.attachment = Some(image);
            }
            _ if command.starts_with('/') => println!("Unknown command {command}"),
            _ => self.send(line).await?,
        }
        Ok(())
    }

    async fn list(&self) {
        let chatrooms = self.sidebar.chatrooms().await;
        if chatrooms.is_empty() {
            println!("{}", self.sidebar.empty_label());
        }
        for (i, room) in chatrooms.iter().enumerate() {
            println!("{:>3}. {} ({} messages)", i + 1, room.title, room.messages.len());
        }
    }

    async fn lookup(&self, key: &str) -> Result<ChatroomId, anyhow::Error> {
        let chatrooms = self.sidebar.chatrooms().await;
        if let Ok(n) = key.parse::<usize>() {
            if let Some(room) = n.checked_sub(1).and_then(|i| chatrooms.get(i)) {
                return Ok(room.id.clone());
            }
        }
        chatrooms
            .into_iter()
            .find(|room| room.id.as_str() == key)
            .map(|room| room.id)
            .ok_or(anyhow!("No chatroom {key}"))
    }

    async fn open(&mut self, id: &ChatroomId) -> Result<(), anyhow::Error> {
        self.view = None;
        let (view, events) = self
            .app
            .open_chat(id)
            .await
            .ok_or(anyhow!("Chatroom not found"))?;
        let title = view.title().await.unwrap_or_default();
        println!("== {title}");
        if view.at_beginning().await {
            println!("   -- Beginning of conversation --");
        } else if view.has_more() {
            println!("   (/older for earlier messages)");
        }
        for message in view.messages().await {
            print_message(&message);
        }
        tokio::spawn(print_events(events));
        self.view = Some(view);
        Ok(())
    }

    async fn older(&self) -> Result<(), anyhow::Error> {
        let view = self.view.as_ref().ok_or(anyhow!("Open a chatroom first"))?;
        let extent = view.messages().await.len() as f64;
        match view.load_older(extent).await {
            LoadOutcome::Loaded(count) => {
                let messages = view.messages().await;
                if !view.has_more() {
                    println!("   -- Beginning of conversation --");
                }
                for message in messages.iter().take(count) {
                    print_message(message);
                }
                view.restore_scroll(messages.len() as f64);
            }
            LoadOutcome::Exhausted | LoadOutcome::Skipped => println!("No older messages"),
            LoadOutcome::Cancelled => {}
        }
        Ok(())
    }

    async fn send(&mut self, text: &str) -> Result<(), anyhow::Error> {
        let view = self.view.as_ref().ok_or(anyhow!("Open a chatroom first"))?;
        let draft = Draft {
            text: text.to_owned(),
            image: self.attachment.take(),
        };
        if view.send(draft).await?.is_none() {
            println!("Chatroom no longer exists");
        }
        Ok(())
    }
}

fn print_message(message: &Message) {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Assistant => "gemini",
    };
    let time = message.timestamp.time_label();
    match &message.image_url {
        Some(url) => println!("[{time}] {who}: {} <{url}>", message.content),
        None => println!("[{time}] {who}: {}", message.content),
    }
}

async fn print_events(mut events: mpsc::UnboundedReceiver<ViewEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ViewEvent::MessageAppended(message) if message.sender == Sender::Assistant => {
                print_message(&message)
            }
            ViewEvent::Typing(true) => println!("   gemini is typing..."),
            ViewEvent::TitleChanged(title) => println!("== {title}"),
            _ => {}
        }
    }
}
