// Terminal front end for the chat server.
//
//   CHAT_API_URL       API root (default http://localhost:5000/api)
//   CHAT_SESSION_FILE  where the active conversation id is remembered
use gemini_chat::client::{ChatEntry, ChatSession, EntryRole, FileSessionStorage, HttpChatApi, SessionStorage, Status};
use std::env;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_SESSION_FILE: &str = ".gemini-chat-session";

fn render(entry: &ChatEntry) {
    let who = match entry.role {
        EntryRole::User => "you",
        EntryRole::Gemini => "gemini",
        EntryRole::Error => "!",
    };
    println!("{:>6} │ {}", who, entry.text.replace('\n', "\n       │ "));
}

fn render_since<S: SessionStorage>(session: &ChatSession<S>, from: usize) {
    for entry in session.entries().iter().skip(from) {
        render(entry);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let api_url = env::var("CHAT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let session_file = env::var("CHAT_SESSION_FILE").unwrap_or_else(|_| DEFAULT_SESSION_FILE.to_string());

    let api = HttpChatApi::new(api_url.clone());
    let mut session = ChatSession::new(FileSessionStorage::new(session_file));

    println!("Gemini chat ({api_url}). Type a message, /new for a new chat, /quit to exit.");

    session.restore(&api).await;
    if let Some(id) = session.conversation_id() {
        println!("── conversation {id} ──");
    }
    render_since(&session, 0);
    if let Some(banner) = session.banner() {
        println!("[{banner}]");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/new" => {
                session.new_chat();
                println!("── new chat ──");
                continue;
            }
            _ => {}
        }

        let before = session.entries().len();
        // the optimistic entry is the user's own line, so only print what came back
        if !session.send(&api, &line).await {
            continue;
        }
        render_since(&session, before + 1);
        if session.status() == Status::ErrorShown {
            if let Some(banner) = session.banner() {
                println!("[{banner}]");
            }
        }
    }

    Ok(())
}
