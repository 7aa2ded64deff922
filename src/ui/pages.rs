//! Signed-in pages: a login screen, then role-gated navigation
//!
//! Every page receives the [`Session`] explicitly and works through a catalog
//! bound to the session's access token.

use anyhow::Result;
use std::io::{BufRead, Write};
use tracing::debug;

use super::console::Console;
use crate::auth::{self, IdentityProvider, Session};
use crate::core::Normalizer;
use crate::db::Catalog;
use crate::models::{NewArtist, NewMood, NewSong, NewUser, Playlist, PlaylistUpdate, Song, UserRole};
use crate::utils::auth::hash_password;

const TITLE: &str = "Mood-Based Playlist Manager";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Users,
    Moods,
    Playlists,
    Songs,
    Artists,
    PlaylistsByMood,
    Reports,
    Logout,
}

impl Page {
    fn label(self) -> &'static str {
        match self {
            Page::Users => "Users",
            Page::Moods => "Moods",
            Page::Playlists => "Playlists",
            Page::Songs => "Songs",
            Page::Artists => "Artists",
            Page::PlaylistsByMood => "Playlists by Mood",
            Page::Reports => "Reports",
            Page::Logout => "Logout",
        }
    }

    /// Pages offered to this session, in menu order
    fn visible_to(session: &Session) -> Vec<Page> {
        let mut pages = vec![
            Page::Moods,
            Page::Playlists,
            Page::Songs,
            Page::Artists,
            Page::PlaylistsByMood,
        ];
        if session.is_admin() {
            pages.insert(0, Page::Users);
            pages.push(Page::Reports);
        }
        pages.push(Page::Logout);
        pages
    }
}

fn or_blank(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn song_label(song: &Song) -> String {
    format!("{} [{}]", song.title, song.song_id)
}

/// Run login and navigation until the operator quits or input ends
pub async fn run_app<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
    identity: &dyn IdentityProvider,
    password_salt: &str,
) -> Result<()> {
    while let Some(session) = login_screen(console, catalog, identity).await? {
        navigate(console, catalog, identity, &session, password_salt).await?;
        if console.is_closed() {
            break;
        }
    }
    Ok(())
}

async fn login_screen<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
    identity: &dyn IdentityProvider,
) -> Result<Option<Session>> {
    const OPTIONS: [&str; 3] = ["Sign in", "Register", "Quit"];

    while let Some(choice) = console.choose(TITLE, &OPTIONS)? {
        match choice {
            0 => {
                let email = console.ask("Email: ")?;
                let password = console.ask("Password: ")?;
                match auth::sign_in(identity, catalog, &email, &password).await {
                    Ok(session) => {
                        console.say("Signed in.")?;
                        return Ok(Some(session));
                    }
                    Err(err) => console.say(format!("Sign-in error: {}", err))?,
                }
            }
            1 => {
                let email = console.ask("Email (register): ")?;
                let password = console.ask("Password: ")?;
                match auth::sign_up(identity, catalog, &email, &password).await {
                    Ok(_) => console.say(
                        "Account created. Verify your email if confirmation is required.",
                    )?,
                    Err(err) => console.say(format!("Sign-up error: {}", err))?,
                }
            }
            _ => break,
        }
    }
    Ok(None)
}

async fn navigate<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
    identity: &dyn IdentityProvider,
    session: &Session,
    password_salt: &str,
) -> Result<()> {
    let scoped = catalog.for_session(&session.access_token);
    let pages = Page::visible_to(session);
    let labels: Vec<&str> = pages.iter().map(|p| p.label()).collect();
    let title = format!("Navigation (signed in as {})", session.email);

    while let Some(choice) = console.choose(&title, &labels)? {
        let page = pages[choice];
        debug!("Opening page {:?}", page);

        match page {
            Page::Users => users_page(console, &scoped, password_salt).await?,
            Page::Moods => moods_page(console, &scoped, session).await?,
            Page::Playlists => playlists_page(console, &scoped, session).await?,
            Page::Songs => songs_page(console, &scoped).await?,
            Page::Artists => artists_page(console, &scoped, session).await?,
            Page::PlaylistsByMood => playlists_by_mood_page(console, &scoped).await?,
            Page::Reports => reports_page(console, &scoped).await?,
            Page::Logout => {
                console.say(format!("Signed in as: {}", session.email))?;
                if console.confirm("Sign out? (y/n): ")? {
                    auth::sign_out(identity, session.clone()).await;
                    console.say("Signed out.")?;
                    return Ok(());
                }
            }
        }
        if console.is_closed() {
            break;
        }
    }
    Ok(())
}

async fn moods_page<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
    session: &Session,
) -> Result<()> {
    while let Some(choice) = console.choose("Moods", &["Create Mood", "List Moods", "Back"])? {
        match choice {
            0 => {
                let name = console.ask("Mood name: ")?;
                let description = console.ask("Description: ")?;
                let mood = NewMood::new(&name, &description).created_by(&session.user_id);
                if let Err(err) = mood.validate() {
                    console.say(format!("Create failed: {}.", err))?;
                    continue;
                }
                match catalog.moods.create(&mood).await {
                    Some(_) => console.say("Mood created.")?,
                    None => console.say("Create failed.")?,
                }
            }
            1 => {
                let moods = catalog.moods.list().await;
                if moods.is_empty() {
                    console.say("No moods found.")?;
                    continue;
                }
                let rows: Vec<Vec<String>> = moods
                    .into_iter()
                    .map(|m| vec![m.mood_id, m.mood_name, m.description.unwrap_or_default()])
                    .collect();
                console.table(&["Mood ID", "Name", "Description"], &rows)?;
            }
            _ => break,
        }
    }
    Ok(())
}

async fn songs_page<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
) -> Result<()> {
    while let Some(choice) = console.choose("Songs", &["Create Song", "List Songs", "Back"])? {
        match choice {
            0 => {
                let title = console.ask("Title: ")?;
                let duration = console.ask_optional("Duration in seconds (optional): ")?;
                let duration = match duration.map(|d| d.parse::<i64>()).transpose() {
                    Ok(duration) => duration,
                    Err(_) => {
                        console.say("Create failed: duration must be a whole number of seconds.")?;
                        continue;
                    }
                };

                let song = NewSong::new(&title).lasting(duration);
                if let Err(err) = song.validate() {
                    console.say(format!("Create failed: {}.", err))?;
                    continue;
                }
                match catalog.songs.create(&song).await {
                    Some(_) => console.say("Song created.")?,
                    None => console.say("Create failed.")?,
                }
            }
            1 => {
                let songs = catalog.songs.list().await;
                if songs.is_empty() {
                    console.say("No songs found.")?;
                    continue;
                }
                let rows: Vec<Vec<String>> = songs
                    .iter()
                    .map(|s| vec![s.song_id.clone(), s.title.clone(), s.duration_label()])
                    .collect();
                console.table(&["Song ID", "Title", "Duration"], &rows)?;
            }
            _ => break,
        }
    }
    Ok(())
}

async fn artists_page<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
    session: &Session,
) -> Result<()> {
    while let Some(choice) =
        console.choose("Artists", &["Create Artist", "List Artists", "Back"])?
    {
        match choice {
            0 => {
                let name = console.ask("Artist name: ")?;
                let description = console.ask_optional("Description: ")?;
                let artist =
                    NewArtist::new(&name, description.as_deref()).created_by(&session.user_id);
                if let Err(err) = artist.validate() {
                    console.say(format!("Create failed: {}.", err))?;
                    continue;
                }
                match catalog.artists.create(&artist).await {
                    Some(_) => console.say("Artist created.")?,
                    None => console.say("Create failed.")?,
                }
            }
            1 => {
                let artists = catalog.artists.list().await;
                if artists.is_empty() {
                    console.say("No artists found.")?;
                    continue;
                }
                let rows: Vec<Vec<String>> = artists
                    .into_iter()
                    .map(|a| vec![a.artist_id, a.name, a.description.unwrap_or_default()])
                    .collect();
                console.table(&["Artist ID", "Name", "Description"], &rows)?;
            }
            _ => break,
        }
    }
    Ok(())
}

async fn users_page<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
    password_salt: &str,
) -> Result<()> {
    while let Some(choice) =
        console.choose("Users (Admin)", &["Create User", "List Users", "Back"])?
    {
        match choice {
            0 => {
                let username = console.ask("Username: ")?;
                let email = console.ask("Email: ")?;
                let password = console.ask("Password: ")?;
                let roles: Vec<String> = UserRole::ALL.iter().map(|r| r.to_string()).collect();
                let role = console
                    .pick("Role (blank for User): ", &roles)?
                    .map(|i| UserRole::ALL[i])
                    .unwrap_or_default();

                let hash = if password.is_empty() {
                    String::new()
                } else {
                    hash_password(&password, password_salt)
                };
                let user = NewUser::new(&username, &email, &hash).with_role(role);
                if let Err(err) = user.validate() {
                    console.say(format!("Create failed: {}.", err))?;
                    continue;
                }
                match catalog.users.create(&user).await {
                    Some(_) => console.say("User created.")?,
                    None => console.say("Create failed.")?,
                }
            }
            1 => {
                let users = catalog.users.list().await;
                if users.is_empty() {
                    console.say("No users found.")?;
                    continue;
                }
                let rows: Vec<Vec<String>> = users
                    .into_iter()
                    .map(|u| {
                        vec![
                            u.user_id,
                            u.username,
                            u.email,
                            u.role.to_string(),
                            or_blank(u.created_at.as_deref()),
                        ]
                    })
                    .collect();
                console.table(&["User ID", "Username", "Email", "Role", "Created At"], &rows)?;
            }
            _ => break,
        }
    }
    Ok(())
}

async fn reports_page<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
) -> Result<()> {
    console.say("\nUsers by role")?;
    let by_role = catalog.reports.count_users_by_role().await;
    if by_role.is_empty() {
        console.say("No data.")?;
    } else {
        let rows: Vec<Vec<String>> = by_role
            .into_iter()
            .map(|r| vec![r.role, r.count.to_string()])
            .collect();
        console.table(&["Role", "Count"], &rows)?;
    }

    console.say("\nPlaylists by mood")?;
    let by_mood = catalog.reports.count_playlists_by_mood().await;
    if by_mood.is_empty() {
        console.say("No data.")?;
    } else {
        let rows: Vec<Vec<String>> = by_mood
            .into_iter()
            .map(|m| vec![or_blank(m.mood_id.as_deref()), m.count.to_string()])
            .collect();
        console.table(&["Mood ID", "Count"], &rows)?;
    }
    Ok(())
}

async fn playlists_by_mood_page<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
) -> Result<()> {
    let moods = catalog.moods.list().await;
    if moods.is_empty() {
        console.say("No moods found. Please create one first.")?;
        return Ok(());
    }

    let labels: Vec<String> = moods.iter().map(|m| m.mood_name.clone()).collect();
    let Some(index) = console.pick("Select a mood: ", &labels)? else {
        return Ok(());
    };
    let mood = &moods[index];

    let playlists = catalog.playlists.list_by_mood(Some(&mood.mood_id)).await;
    if playlists.is_empty() {
        console.say(format!("No playlists found for mood {}.", mood.mood_name))?;
        return Ok(());
    }

    console.say(format!("Playlists for {} mood:", mood.mood_name))?;
    let rows: Vec<Vec<String>> = playlists
        .into_iter()
        .map(|p| vec![p.name, p.created_at.unwrap_or_else(|| "N/A".to_string())])
        .collect();
    console.table(&["Name", "Created At"], &rows)
}

/// Pick a mood by number; `None` for blank input or when no moods exist
async fn pick_mood<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
    prompt: &str,
) -> Result<Option<String>> {
    let moods = catalog.moods.list().await;
    if moods.is_empty() {
        return Ok(None);
    }
    let labels: Vec<String> = moods.iter().map(|m| m.mood_name.clone()).collect();
    Ok(console
        .pick(prompt, &labels)?
        .map(|i| moods[i].mood_id.clone()))
}

async fn playlists_page<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
    session: &Session,
) -> Result<()> {
    const OPTIONS: [&str; 4] = ["Create Playlist", "List Playlists", "Manage Playlist", "Back"];
    let normalizer = Normalizer::new(catalog.store.clone());

    while let Some(choice) = console.choose("Playlists", &OPTIONS)? {
        match choice {
            0 => {
                let name = console.ask("Playlist name: ")?;
                if name.is_empty() {
                    console.say("Enter a playlist name.")?;
                    continue;
                }
                let description = console.ask("Description: ")?;
                let mood_id = pick_mood(console, catalog, "Mood (blank for none): ").await?;

                let created = normalizer
                    .create_playlist(
                        &catalog.playlists,
                        &session.user_id,
                        &name,
                        &description,
                        mood_id.as_deref(),
                    )
                    .await;
                match created {
                    Some(_) => console.say("Playlist created.")?,
                    None => console.say("Create failed.")?,
                }
            }
            1 => {
                let search = console.ask_optional("Search by name (blank for all): ")?;
                let mut playlists = normalizer
                    .list_playlists_for_user(&catalog.playlists, &session.user_id)
                    .await;
                if let Some(search) = search.map(|s| s.to_lowercase()) {
                    playlists.retain(|p| p.name.to_lowercase().contains(&search));
                }
                if playlists.is_empty() {
                    console.say("No playlists yet.")?;
                    continue;
                }
                let rows: Vec<Vec<String>> = playlists
                    .into_iter()
                    .map(|p| vec![p.playlist_id, p.name, or_blank(p.created_at.as_deref())])
                    .collect();
                console.table(&["Playlist ID", "Name", "Created At"], &rows)?;
            }
            2 => {
                let playlists = normalizer
                    .list_playlists_for_user(&catalog.playlists, &session.user_id)
                    .await;
                if playlists.is_empty() {
                    console.say("No playlists yet.")?;
                    continue;
                }
                let labels: Vec<String> = playlists.iter().map(|p| p.name.clone()).collect();
                if let Some(i) = console.pick("Select playlist to manage: ", &labels)? {
                    manage_playlist(console, catalog, &normalizer, session, &playlists[i]).await?;
                }
            }
            _ => break,
        }
        if console.is_closed() {
            break;
        }
    }
    Ok(())
}

async fn manage_playlist<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
    normalizer: &Normalizer,
    session: &Session,
    playlist: &Playlist,
) -> Result<()> {
    const OPTIONS: [&str; 6] = [
        "Update Playlist",
        "Delete Playlist",
        "Songs in Playlist",
        "Remove Song",
        "Add Song",
        "Back",
    ];
    let id = playlist.playlist_id.as_str();
    let title = format!("Manage: {}", playlist.name);

    while let Some(choice) = console.choose(&title, &OPTIONS)? {
        match choice {
            0 => {
                console.say("Press Enter to keep the current value.")?;
                let changes = PlaylistUpdate {
                    name: console.ask_optional("New name: ")?,
                    description: console.ask_optional("New description: ")?,
                    mood_id: pick_mood(console, catalog, "New mood (blank to keep): ").await?,
                };
                if changes.is_empty() {
                    console.say("Nothing to update.")?;
                    continue;
                }
                let updated = normalizer
                    .update_playlist(&catalog.playlists, id, &changes)
                    .await;
                console.say(if updated { "Playlist updated." } else { "Update failed." })?;
            }
            1 => {
                if !console.confirm("Delete this playlist? (y/n): ")? {
                    console.say("Delete cancelled.")?;
                    continue;
                }
                if normalizer
                    .delete_playlist(&catalog.playlists, id, Some(&session.user_id))
                    .await
                {
                    console.say("Deleted.")?;
                    return Ok(());
                }
                console.say("Delete failed.")?;
            }
            2 => {
                let songs = normalizer
                    .songs_in_playlist(&catalog.playlist_songs, &catalog.playlists, id)
                    .await;
                if songs.is_empty() {
                    console.say("No songs in this playlist.")?;
                    continue;
                }
                let rows: Vec<Vec<String>> = songs
                    .iter()
                    .map(|s| vec![s.song_id.clone(), s.title.clone(), s.duration_label()])
                    .collect();
                console.table(&["Song ID", "Title", "Duration"], &rows)?;
            }
            3 => {
                let songs = normalizer
                    .songs_in_playlist(&catalog.playlist_songs, &catalog.playlists, id)
                    .await;
                if songs.is_empty() {
                    console.say("No songs in this playlist.")?;
                    continue;
                }
                let labels: Vec<String> = songs.iter().map(song_label).collect();
                if let Some(i) = console.pick("Select song to remove: ", &labels)? {
                    let removed = normalizer
                        .remove_song_from_playlist(&catalog.playlist_songs, id, &songs[i].song_id)
                        .await;
                    console.say(if removed { "Removed song." } else { "Remove failed." })?;
                }
            }
            4 => {
                let songs = catalog.songs.list().await;
                if songs.is_empty() {
                    console.say("No songs available (create songs on the Songs page).")?;
                    continue;
                }
                let labels: Vec<String> = songs.iter().map(song_label).collect();
                if let Some(i) = console.pick("Select song to add: ", &labels)? {
                    let added = normalizer
                        .add_song_to_playlist(&catalog.playlist_songs, id, &songs[i].song_id)
                        .await;
                    console.say(if added { "Song added." } else { "Add failed." })?;
                }
            }
            _ => break,
        }
    }
    Ok(())
}
