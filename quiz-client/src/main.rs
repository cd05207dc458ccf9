use anyhow::{Context, Result, anyhow, bail};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use quiz_client::render::render;
use quiz_client::{AppContext, ChannelStatus, Config, telemetry};
use quiz_core::{
    ChangePasswordForm, CreateRoomForm, LoginForm, NotificationInbox, RegisterForm,
    ResetPasswordForm, VerifyEmailForm,
};
use quiz_types::{ProfileUpdate, RoomFilters, ServerEvent, event_names};

const USAGE: &str = "usage: quizarena <command>

commands:
  login <email> <password>
  register <username> <email> <password>
  verify <code>
  resend-verification
  forgot-password <email>
  reset-password <email> <code> <new-password> <confirm>
  passwd <current> <new-password> <confirm>
  rename <username>
  avatar <image-file>
  logout
  whoami
  rooms
  create [difficulty] [questions] [seconds]
  play <CODE>
  leaderboard
  history
  notifications
  achievements";

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = Config::from_env()?;
    let ctx = AppContext::new(config)
        .await
        .context("Failed to open the session store")?;

    if !matches!(
        command.as_str(),
        "login" | "register" | "forgot-password" | "reset-password"
    ) {
        ctx.auth.restore().await?;
    }

    match (command.as_str(), &args[1..]) {
        ("login", [email, password]) => {
            let response = ctx
                .auth
                .login(LoginForm {
                    email: email.clone(),
                    password: password.clone(),
                })
                .await?;
            println!("Logged in as {}", response.user.username);
        }
        ("register", [username, email, password]) => {
            let response = ctx
                .auth
                .register(RegisterForm {
                    username: username.clone(),
                    email: email.clone(),
                    password: password.clone(),
                    confirm_password: password.clone(),
                })
                .await?;
            println!("Registered {}", response.user.username);
            if response.requires_verification {
                println!("Check your email for a verification code");
            }
        }
        ("verify", [code]) => {
            let message = ctx
                .auth
                .verify_email(VerifyEmailForm { otp: code.clone() })
                .await?;
            println!("{}", message.as_deref().unwrap_or("Email verified"));
        }
        ("resend-verification", []) => {
            ctx.auth.require_session().await?;
            let message = ctx.api().resend_verification().await?;
            println!("{}", message.as_deref().unwrap_or("Verification code sent"));
        }
        ("forgot-password", [email]) => {
            let message = ctx.api().forgot_password(email).await?;
            println!("{}", message.as_deref().unwrap_or("Reset code sent"));
        }
        ("reset-password", [email, code, password, confirm]) => {
            let request = ResetPasswordForm {
                email: email.clone(),
                otp: code.clone(),
                new_password: password.clone(),
                confirm_password: confirm.clone(),
            }
            .into_request()
            .map_err(|e| anyhow!(quiz_core::describe_errors(&e)))?;
            let message = ctx.api().reset_password(&request).await?;
            println!("{}", message.as_deref().unwrap_or("Password reset"));
        }
        ("passwd", [current, password, confirm]) => {
            let message = ctx
                .auth
                .change_password(ChangePasswordForm {
                    current_password: current.clone(),
                    new_password: password.clone(),
                    confirm_password: confirm.clone(),
                })
                .await?;
            println!("{}", message.as_deref().unwrap_or("Password changed"));
        }
        ("rename", [username]) => {
            let user = ctx
                .auth
                .update_profile(&ProfileUpdate {
                    username: Some(username.clone()),
                    avatar: None,
                })
                .await?;
            println!("Now known as {}", user.username);
        }
        ("avatar", [path]) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Could not read {}", path))?;
            let file_name = std::path::Path::new(path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("avatar");
            let user = ctx
                .auth
                .upload_avatar(file_name, image_mime(path)?, bytes)
                .await?;
            println!("Avatar updated: {}", user.avatar);
        }
        ("logout", []) => {
            ctx.auth.logout().await?;
            println!("Logged out");
        }
        ("whoami", []) => {
            let user = ctx.auth.refresh_profile().await?;
            let stats = &user.stats;
            println!("{} <{}>", user.username, user.email);
            println!(
                "games {}  wins {}  points {}  win rate {:.1}%",
                stats.games_played, stats.wins, stats.total_points, stats.win_rate
            );
        }
        ("rooms", []) => {
            let rooms = ctx
                .api()
                .list_rooms(&RoomFilters {
                    status: Some("waiting".to_string()),
                    difficulty: None,
                })
                .await?;
            if rooms.is_empty() {
                println!("No open rooms");
            }
            for room in rooms {
                println!(
                    "{}  {:<12} {:<6} {}/10 players  ~{} min",
                    room.room_code,
                    room.settings.category,
                    room.settings.difficulty,
                    room.players.len(),
                    room.settings.estimated_minutes()
                );
            }
        }
        ("create", rest) if rest.len() <= 3 => {
            ctx.auth.require_session().await?;
            let mut form = CreateRoomForm::default();
            if let Some(difficulty) = rest.first() {
                form.difficulty = difficulty.parse().map_err(|e: String| anyhow!(e))?;
            }
            if let Some(questions) = rest.get(1) {
                form.number_of_questions = questions.parse().context("questions must be a number")?;
            }
            if let Some(seconds) = rest.get(2) {
                form.time_per_question = seconds.parse().context("seconds must be a number")?;
            }
            let request = form.into_request().map_err(|e| anyhow!(quiz_core::describe_errors(&e)))?;
            let room = ctx.api().create_room(&request).await?;
            println!("Created room {}", room.room_code);
        }
        ("play", [code]) => play(&ctx, &code.to_uppercase()).await?,
        ("leaderboard", []) => {
            for (i, entry) in ctx.api().leaderboard(10).await?.iter().enumerate() {
                println!(
                    "{:>2}. {:<20} {:>8} pts  {:>3} wins",
                    i + 1,
                    entry.username,
                    entry.total_score,
                    entry.total_wins
                );
            }
        }
        ("history", []) => {
            let session = ctx.auth.require_session().await?;
            for game in ctx.api().game_history(10).await? {
                let mine = quiz_core::Standings::standing_for(&game.players, &session.user.id);
                println!(
                    "{}  {} / {}  rank {}",
                    game.finished_at,
                    game.settings.category,
                    game.settings.difficulty,
                    mine.map(|r| r.rank.to_string()).unwrap_or_else(|| "-".to_string())
                );
            }
        }
        ("notifications", []) => {
            ctx.auth.require_session().await?;
            let payload = ctx.api().notifications(false).await?;
            let mut inbox = NotificationInbox::new();
            inbox.set(payload.notifications, payload.unread_count);
            println!("{} unread", inbox.unread_count());
            for n in inbox.items() {
                println!("{} {}: {}", if n.is_read { " " } else { "*" }, n.title, n.message);
            }
        }
        ("achievements", []) => {
            ctx.auth.require_session().await?;
            let payload = ctx.api().achievements().await?;
            println!("{}/{} unlocked", payload.count, payload.total);
            for achievement in payload.achievements {
                println!("  {} {}", achievement.icon, achievement.title);
            }
        }
        _ => bail!("{}", USAGE),
    }

    Ok(())
}

fn image_mime(path: &str) -> Result<&'static str> {
    let extension = std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => Ok("image/png"),
        Some("jpg" | "jpeg") => Ok("image/jpeg"),
        Some("gif") => Ok("image/gif"),
        Some("webp") => Ok("image/webp"),
        _ => bail!("Avatar must be a png, jpeg, gif or webp image"),
    }
}

async fn play(ctx: &AppContext, code: &str) -> Result<()> {
    let session = ctx.auth.require_session().await?;

    let mut status = ctx.channel().subscribe_status();
    tokio::time::timeout(
        ctx.config.connect_timeout + Duration::from_secs(1),
        status.wait_for(|s| matches!(s, ChannelStatus::Connected | ChannelStatus::Failed)),
    )
    .await
    .map_err(|_| anyhow!("Timed out connecting to the game server"))??;
    if ctx.channel().status() != ChannelStatus::Connected {
        bail!("Could not connect to the game server");
    }

    let inbox = Arc::new(Mutex::new(NotificationInbox::new()));
    match ctx.api().notifications(true).await {
        Ok(payload) => {
            if let Ok(mut inbox) = inbox.lock() {
                inbox.set(payload.notifications, payload.unread_count);
            }
        }
        Err(e) => warn!("Could not load notifications: {}", e.user_message()),
    }
    let notification_handler = {
        let inbox = inbox.clone();
        ctx.channel()
            .on(event_names::NOTIFICATION_NEW, move |event: &ServerEvent| {
                if let ServerEvent::NotificationNew(payload) = event {
                    println!("[notification] {}", payload.notification.title);
                    if let Ok(mut inbox) = inbox.lock() {
                        inbox.push_new(payload.notification.clone());
                    }
                }
            })
    };

    let view = ctx.open_room(code).await?;
    info!("Playing in room {}", view.code());

    let mut states = view.subscribe();
    let user_id = session.user.id.clone();
    let printer = tokio::spawn(async move {
        loop {
            let state = states.borrow_and_update().clone();
            print!("{}", render(&state, &user_id));
            if state.exit.is_some() || states.changed().await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let input = line.trim();
                let outcome = match input {
                    "ready" => view.toggle_ready().await.map_err(anyhow::Error::from),
                    "start" => view.start_game().await.map_err(anyhow::Error::from),
                    "leave" | "quit" => {
                        view.leave().await?;
                        break;
                    }
                    "" => Ok(()),
                    other => match other.parse::<usize>() {
                        Ok(number) => {
                            if !view.select_option(number) {
                                println!("Can't answer right now");
                            }
                            Ok(())
                        }
                        Err(_) => Err(anyhow!("Type a number, 'ready', 'start' or 'leave'")),
                    },
                };
                if let Err(e) = outcome {
                    println!("{}", e);
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if view.state().exit.is_some() {
                    break;
                }
            }
        }
    }

    view.close();
    ctx.channel()
        .off(event_names::NOTIFICATION_NEW, Some(notification_handler));
    printer.abort();
    Ok(())
}
