use anyhow::{Context, Result};
use clap::Parser;
use murmur::app::{App, RenderInstruction};
use murmur::config::Config;
use murmur::feed::{NewPost, Post, PostImage, ReactionKind, ViewerVote};
use secrecy::SecretString;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Get the config file path (~/.config/murmur/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("murmur")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(name = "murmur", about = "Terminal client for PostApp-style feed servers")]
struct Args {
    /// Feed server base URL (overrides the config file)
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Path to config.toml (default: ~/.config/murmur/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Per-request timeout in seconds (overrides the config file)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let mut config = Config::load(&config_path).context("Failed to load configuration")?;
    if let Some(server) = args.server {
        config.server_url = server;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }

    let (mut app, mut render_rx) =
        App::new(&config).with_context(|| format!("Bad server URL: {}", config.server_url))?;

    println!("murmur: connected to {}", config.server_url);
    if app.init().await {
        println!("Session restored.");
    } else {
        println!("Not logged in. Use: login <username> [password]");
    }
    render(&app, &mut render_rx);

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        if let Err(e) = dispatch(&mut app, &config, line).await {
            // Operation failures are local; the session keeps going.
            println!("error: {e}");
        }
        render(&app, &mut render_rx);
    }

    println!("Goodbye!");
    Ok(())
}

/// Resolves the password for login/register: explicit argument, then the
/// MURMUR_PASSWORD env var, then the config file.
fn resolve_password(explicit: Option<&str>, config: &Config) -> Result<SecretString> {
    if let Some(p) = explicit {
        return Ok(SecretString::from(p));
    }
    if let Ok(p) = std::env::var("MURMUR_PASSWORD") {
        return Ok(SecretString::from(p));
    }
    if let Some(p) = &config.password {
        return Ok(SecretString::from(p.as_str()));
    }
    anyhow::bail!("no password given (argument, MURMUR_PASSWORD, or config file)")
}

async fn dispatch(app: &mut App, config: &Config, line: &str) -> Result<()> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();

    match command {
        "help" => print_help(),
        "register" => {
            let username = words.next().context("usage: register <username> [password]")?;
            let password = resolve_password(words.next(), config)?;
            app.register(username, &password).await?;
            println!("Registered. Now: login {username}");
        }
        "login" => {
            let username = match words.next() {
                Some(u) => u.to_string(),
                None => config
                    .username
                    .clone()
                    .context("usage: login <username> [password]")?,
            };
            let password = resolve_password(words.next(), config)?;
            app.login(&username, &password).await?;
        }
        "logout" => {
            app.logout().await?;
        }
        "posts" => {
            app.reload_feed().await;
        }
        "cats" => {
            if !app.filter.is_loaded() {
                app.load_categories().await;
            }
            for cat in app.filter.categories() {
                let marker = if app.filter.selected() == Some(cat.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(" {marker} {}  {}", cat.id, cat.name);
            }
        }
        "filter" => {
            let id = words.next().context("usage: filter <category-id>")?;
            app.select_category(id).await?;
        }
        "all" => {
            app.select_all().await?;
        }
        "post" => {
            // post <cat1,cat2> <content...>
            let categories: Vec<String> = words
                .next()
                .context("usage: post <cat1,cat2> <content> [--image <file>]")?
                .split(',')
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            let rest: Vec<&str> = words.collect();
            let (content, image) = split_image_flag(&rest)?;
            app.create_post(NewPost {
                content,
                categories,
                image,
            })
            .await?;
        }
        "like" | "dislike" => {
            let post_id = words.next().context("usage: like|dislike <post-id>")?;
            let kind = if command == "like" {
                ReactionKind::Like
            } else {
                ReactionKind::Dislike
            };
            app.react(post_id, kind).await?;
        }
        "comments" => {
            let post_id = words.next().context("usage: comments <post-id>")?;
            app.reveal_comments(post_id).await?;
        }
        "comment" => {
            let post_id = words.next().context("usage: comment <post-id> <content>")?;
            let content: String = words.collect::<Vec<_>>().join(" ");
            app.submit_comment(post_id, &content).await?;
        }
        other => {
            println!("unknown command '{other}' (try: help)");
        }
    }
    Ok(())
}

/// Splits a trailing `--image <file>` off the content words and reads the
/// file into an attachment part.
fn split_image_flag(words: &[&str]) -> Result<(String, Option<PostImage>)> {
    if let Some(pos) = words.iter().position(|w| *w == "--image") {
        let path = words
            .get(pos + 1)
            .context("--image requires a file path")?;
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read image '{path}'"))?;
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        let mime = match std::path::Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
        {
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            _ => "image/jpeg",
        };
        let content = words[..pos].join(" ");
        Ok((
            content,
            Some(PostImage {
                file_name,
                bytes,
                mime: mime.to_string(),
            }),
        ))
    } else {
        Ok((words.join(" "), None))
    }
}

fn print_help() {
    println!("commands:");
    println!("  register <user> [pass]      create an account");
    println!("  login [user] [pass]         log in (password also via MURMUR_PASSWORD)");
    println!("  logout");
    println!("  posts                       reload the current view");
    println!("  cats                        list categories");
    println!("  filter <category-id>        show one category");
    println!("  all                         show the whole feed");
    println!("  post <cats> <text> [--image <file>]");
    println!("  like <post-id> / dislike <post-id>");
    println!("  comments <post-id>          reveal a post's comments");
    println!("  comment <post-id> <text>    add a comment");
    println!("  quit");
}

// ============================================================================
// Rendering
// ============================================================================

/// Drains the render channel and draws each instruction from the current
/// snapshots. This is the whole rendering collaborator: the core hands over
/// plain data and everything string-shaped happens here.
fn render(app: &App, rx: &mut mpsc::UnboundedReceiver<RenderInstruction>) {
    while let Ok(instruction) = rx.try_recv() {
        match instruction {
            RenderInstruction::SessionChanged { authenticated } => {
                if authenticated {
                    let who = app.session.username().unwrap_or("(cookie session)");
                    println!("-- logged in as {who}");
                } else {
                    println!("-- logged out");
                }
            }
            RenderInstruction::CategoriesLoaded { count } => {
                println!("-- {count} categories (see: cats)");
            }
            RenderInstruction::FilterChanged { selected } => match selected {
                Some(id) => println!("-- filtering by category {id}"),
                None => println!("-- showing all posts"),
            },
            RenderInstruction::FeedReplaced { posts } => {
                if posts == 0 {
                    println!("No posts yet. Be the first to post!");
                }
                for post in app.feed.posts() {
                    print_post(post);
                }
            }
            RenderInstruction::PostInserted { post_id } => {
                if let Some(post) = app.feed.get(&post_id) {
                    print_post(post);
                }
            }
            RenderInstruction::ReactionChanged {
                post_id,
                likes,
                dislikes,
                viewer_vote,
            } => {
                println!(
                    "-- {post_id}: {likes} likes, {dislikes} dislikes{}",
                    vote_marker(viewer_vote)
                );
            }
            RenderInstruction::CommentsRevealed { post_id, comments } => {
                if comments == 0 {
                    println!("No comments yet");
                }
                if let Some(thread) = app.comments.thread(&post_id) {
                    for comment in &thread.comments {
                        println!(
                            "  [{}] {}: {}",
                            comment.created_at.format("%Y-%m-%d %H:%M"),
                            comment.author,
                            comment.content
                        );
                    }
                }
            }
            RenderInstruction::CommentSubmitted {
                post_id,
                comment_count,
                appended,
            } => {
                println!("-- {post_id} now has {comment_count} comments");
                if appended {
                    if let Some(comment) =
                        app.comments.thread(&post_id).and_then(|t| t.comments.last())
                    {
                        println!("  {}: {}", comment.author, comment.content);
                    }
                }
            }
            RenderInstruction::LoadFailed {
                context,
                message,
                retryable,
            } => {
                print!("Failed to load {context}: {message}");
                if retryable {
                    print!("  (retry with: posts)");
                }
                println!();
            }
        }
    }
}

fn print_post(post: &Post) {
    let categories: Vec<&str> = post.categories.iter().map(String::as_str).collect();
    println!(
        "[{}] {} ({})  {}",
        post.id,
        post.author,
        post.created_at.format("%Y-%m-%d %H:%M"),
        categories.join(", ")
    );
    println!("    {}", post.content);
    if let Some(image) = &post.image_path {
        println!("    (image: {image})");
    }
    println!(
        "    {} likes  {} dislikes  {} comments{}",
        post.likes,
        post.dislikes,
        post.comment_count,
        vote_marker(post.viewer_vote)
    );
}

fn vote_marker(vote: ViewerVote) -> &'static str {
    match vote {
        ViewerVote::None => "",
        ViewerVote::Like => "  [you liked this]",
        ViewerVote::Dislike => "  [you disliked this]",
    }
}
