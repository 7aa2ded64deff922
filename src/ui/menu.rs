//! Numbered text menus over every entity table

use anyhow::Result;
use serde::Serialize;
use std::io::{BufRead, Write};

use super::console::Console;
use crate::db::Catalog;
use crate::models::{
    ArtistUpdate, MoodUpdate, NewArtist, NewMood, NewPlaylist, NewSong, NewUser, PlaylistUpdate,
    SongUpdate, UserRole,
};
use crate::utils::auth::hash_password;

const DELETE_PROMPT: &str = "Are you sure? This action cannot be undone (y/n): ";
const SKIP_HINT: &str = "Press Enter to skip updating a field.";

fn show<T: Serialize, R: BufRead, W: Write>(console: &mut Console<R, W>, record: &T) -> Result<()> {
    console.say(serde_json::to_string_pretty(record)?)
}

fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or("None")
}

/// Whole seconds, or `None` for blank or non-numeric input
fn seconds(input: Option<String>) -> Option<i64> {
    input.and_then(|s| s.parse::<u32>().ok()).map(i64::from)
}

/// Top-level menu; returns when the operator exits or input ends
pub async fn main_menu<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
    password_salt: &str,
) -> Result<()> {
    const OPTIONS: [&str; 8] = [
        "User Management",
        "Playlist Management",
        "Mood Management",
        "Manage Songs in Playlists",
        "Song Management",
        "Artist Management",
        "Reports",
        "Exit",
    ];

    while let Some(choice) = console.choose("Mood-Based Playlist Manager", &OPTIONS)? {
        match choice {
            0 => user_menu(console, catalog, password_salt).await?,
            1 => playlist_menu(console, catalog).await?,
            2 => mood_menu(console, catalog).await?,
            3 => playlist_song_menu(console, catalog).await?,
            4 => song_menu(console, catalog).await?,
            5 => artist_menu(console, catalog).await?,
            6 => report_menu(console, catalog).await?,
            _ => {
                console.say("Exiting...")?;
                break;
            }
        }
        if console.is_closed() {
            break;
        }
    }
    Ok(())
}

async fn user_menu<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
    password_salt: &str,
) -> Result<()> {
    const OPTIONS: [&str; 6] = [
        "Create User",
        "Get User by Email",
        "Update User Role",
        "Delete User",
        "List All Users",
        "Back to Main Menu",
    ];

    while let Some(choice) = console.choose("User Management", &OPTIONS)? {
        match choice {
            0 => {
                let username = console.ask("Enter username: ")?;
                let email = console.ask("Enter email: ")?;
                let password = console.ask("Enter password: ")?;
                let role = console
                    .ask_optional("Enter role (User/Admin) [default User]: ")?
                    .map(|r| r.parse::<UserRole>())
                    .transpose();

                let role = match role {
                    Ok(role) => role.unwrap_or_default(),
                    Err(err) => {
                        console.say(format!("Error creating user: {}", err))?;
                        continue;
                    }
                };
                let password_hash = if password.is_empty() {
                    String::new()
                } else {
                    hash_password(&password, password_salt)
                };

                let user = NewUser::new(&username, &email, &password_hash).with_role(role);
                match catalog.users.create(&user).await {
                    Some(user) => console.say(format!(
                        "User created successfully! User ID: {}",
                        user.user_id
                    ))?,
                    None => console.say("Error creating user.")?,
                }
            }
            1 => {
                let email = console.ask("Enter user email: ")?;
                match catalog.users.get_by_email(&email).await {
                    Some(user) => {
                        console.say("User found:")?;
                        show(console, &user)?;
                    }
                    None => console.say("User not found.")?,
                }
            }
            2 => {
                let user_id = console.ask("Enter user ID to update role: ")?;
                let role = console.ask("Enter new role (User/Admin): ")?;
                let updated = match role.parse::<UserRole>() {
                    Ok(role) => catalog.users.update_role(&user_id, role).await,
                    Err(_) => false,
                };
                console.say(if updated {
                    "User role updated successfully."
                } else {
                    "Failed to update role."
                })?;
            }
            3 => {
                let user_id = console.ask("Enter user ID to delete: ")?;
                if console.confirm(DELETE_PROMPT)? {
                    console.say(if catalog.users.delete(&user_id).await {
                        "User deleted successfully."
                    } else {
                        "Failed to delete user."
                    })?;
                } else {
                    console.say("Delete cancelled.")?;
                }
            }
            4 => {
                let users = catalog.users.list().await;
                console.say(format!("Total users: {}", users.len()))?;
                for u in users {
                    console.say(format!(
                        "- ID: {}, Username: {}, Email: {}, Role: {}",
                        u.user_id, u.username, u.email, u.role
                    ))?;
                }
            }
            _ => break,
        }
    }
    Ok(())
}

async fn playlist_menu<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
) -> Result<()> {
    const OPTIONS: [&str; 6] = [
        "Create Playlist",
        "Get Playlist by ID",
        "Update Playlist",
        "Delete Playlist",
        "List All Playlists",
        "Back to Main Menu",
    ];

    while let Some(choice) = console.choose("Playlist Management", &OPTIONS)? {
        match choice {
            0 => {
                let user_id = console.ask("Enter User ID who owns the playlist: ")?;
                let name = console.ask("Enter Playlist Name: ")?;
                let description = console.ask("Enter Description (optional): ")?;
                let mood_id = console.ask_optional("Enter Mood ID (optional): ")?;

                let playlist = NewPlaylist::new(&user_id, &name)
                    .describe(&description)
                    .with_mood(mood_id.as_deref());
                match catalog.playlists.create(&playlist).await {
                    Some(p) => console.say(format!("Playlist created! Playlist ID: {}", p.playlist_id))?,
                    None => console.say("Failed to create playlist.")?,
                }
            }
            1 => {
                let playlist_id = console.ask("Enter Playlist ID: ")?;
                match catalog.playlists.get(&playlist_id).await {
                    Some(p) => show(console, &p)?,
                    None => console.say("Playlist not found.")?,
                }
            }
            2 => {
                let playlist_id = console.ask("Enter Playlist ID to update: ")?;
                console.say(SKIP_HINT)?;
                let changes = PlaylistUpdate {
                    name: console.ask_optional("New Playlist Name: ")?,
                    description: console.ask_optional("New Description: ")?,
                    mood_id: console.ask_optional("New Mood ID: ")?,
                };
                let updated = catalog.playlists.update(&playlist_id, &changes).await;
                console.say(if updated { "Playlist updated." } else { "Update failed." })?;
            }
            3 => {
                let playlist_id = console.ask("Enter Playlist ID to delete: ")?;
                if console.confirm(DELETE_PROMPT)? {
                    let deleted = catalog.playlists.delete(&playlist_id).await;
                    console.say(if deleted { "Playlist deleted." } else { "Delete failed." })?;
                } else {
                    console.say("Delete cancelled.")?;
                }
            }
            4 => {
                let playlists = catalog.playlists.list().await;
                console.say(format!("Total playlists: {}", playlists.len()))?;
                for p in playlists {
                    console.say(format!(
                        "- ID: {}, Name: {}, User ID: {}, Mood ID: {}",
                        p.playlist_id,
                        p.name,
                        p.user_id,
                        or_none(p.mood_id.as_deref())
                    ))?;
                }
            }
            _ => break,
        }
    }
    Ok(())
}

async fn mood_menu<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
) -> Result<()> {
    const OPTIONS: [&str; 6] = [
        "Create Mood",
        "Get Mood by ID",
        "Update Mood",
        "Delete Mood",
        "List All Moods",
        "Back to Main Menu",
    ];

    while let Some(choice) = console.choose("Mood Management", &OPTIONS)? {
        match choice {
            0 => {
                let name = console.ask("Enter Mood Name: ")?;
                let description = console.ask("Enter Description (optional): ")?;
                match catalog.moods.create(&NewMood::new(&name, &description)).await {
                    Some(m) => console.say(format!("Mood created! Mood ID: {}", m.mood_id))?,
                    None => console.say("Failed to create mood.")?,
                }
            }
            1 => {
                let mood_id = console.ask("Enter Mood ID: ")?;
                match catalog.moods.get(&mood_id).await {
                    Some(m) => show(console, &m)?,
                    None => console.say("Mood not found.")?,
                }
            }
            2 => {
                let mood_id = console.ask("Enter Mood ID to update: ")?;
                console.say(SKIP_HINT)?;
                let changes = MoodUpdate {
                    mood_name: console.ask_optional("New Mood Name: ")?,
                    description: console.ask_optional("New Description: ")?,
                };
                let updated = catalog.moods.update(&mood_id, &changes).await;
                console.say(if updated { "Mood updated." } else { "Update failed." })?;
            }
            3 => {
                let mood_id = console.ask("Enter Mood ID to delete: ")?;
                if console.confirm(DELETE_PROMPT)? {
                    let deleted = catalog.moods.delete(&mood_id).await;
                    console.say(if deleted { "Mood deleted." } else { "Delete failed." })?;
                } else {
                    console.say("Delete cancelled.")?;
                }
            }
            4 => {
                let moods = catalog.moods.list().await;
                console.say(format!("Total moods: {}", moods.len()))?;
                for m in moods {
                    console.say(format!(
                        "- ID: {}, Name: {}, Description: {}",
                        m.mood_id,
                        m.mood_name,
                        m.description.unwrap_or_default()
                    ))?;
                }
            }
            _ => break,
        }
    }
    Ok(())
}

async fn playlist_song_menu<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
) -> Result<()> {
    const OPTIONS: [&str; 5] = [
        "Add Song to Playlist",
        "Remove Song from Playlist",
        "List Songs in Playlist",
        "List Playlists Containing Song",
        "Back to Main Menu",
    ];

    while let Some(choice) = console.choose("Manage Songs in Playlists", &OPTIONS)? {
        match choice {
            0 => {
                let playlist_id = console.ask("Enter Playlist ID: ")?;
                let song_id = console.ask("Enter Song ID to add: ")?;
                let added = catalog.playlist_songs.add(&playlist_id, &song_id).await;
                console.say(if added { "Song added to playlist." } else { "Failed to add song." })?;
            }
            1 => {
                let playlist_id = console.ask("Enter Playlist ID: ")?;
                let song_id = console.ask("Enter Song ID to remove: ")?;
                let removed = catalog.playlist_songs.remove(&playlist_id, &song_id).await;
                console.say(if removed {
                    "Song removed from playlist."
                } else {
                    "Failed to remove song."
                })?;
            }
            2 => {
                let playlist_id = console.ask("Enter Playlist ID to list songs: ")?;
                let songs = catalog.playlist_songs.list_songs(&playlist_id).await;
                if songs.is_empty() {
                    console.say("No songs found or playlist is empty.")?;
                } else {
                    console.say(format!("Songs in playlist {}:", playlist_id))?;
                    for s in songs {
                        console.say(format!("- Song ID: {}, Title: {}", s.song_id, s.title))?;
                    }
                }
            }
            3 => {
                let song_id = console.ask("Enter Song ID: ")?;
                let playlists = catalog.playlist_songs.list_playlists(&song_id).await;
                if playlists.is_empty() {
                    console.say("No playlists contain this song.")?;
                } else {
                    console.say(format!("Playlists containing song {}:", song_id))?;
                    for p in playlists {
                        console.say(format!("- Playlist ID: {}, Name: {}", p.playlist_id, p.name))?;
                    }
                }
            }
            _ => break,
        }
    }
    Ok(())
}

async fn song_menu<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
) -> Result<()> {
    const OPTIONS: [&str; 6] = [
        "Create Song",
        "Get Song by ID",
        "Update Song",
        "Delete Song",
        "List All Songs",
        "Back to Main Menu",
    ];

    while let Some(choice) = console.choose("Song Management", &OPTIONS)? {
        match choice {
            0 => {
                let title = console.ask("Enter Song Title: ")?;
                let duration = seconds(console.ask_optional("Enter Duration in seconds (optional): ")?);
                let artist_id = console.ask_optional("Enter Artist ID (optional): ")?;
                let mut song = NewSong::new(&title)
                    .lasting(duration)
                    .by_artist(artist_id.as_deref());
                song.genre_id = console.ask_optional("Enter Genre ID (optional): ")?;

                match catalog.songs.create(&song).await {
                    Some(s) => console.say(format!("Song created! Song ID: {}", s.song_id))?,
                    None => console.say("Failed to create song.")?,
                }
            }
            1 => {
                let song_id = console.ask("Enter Song ID: ")?;
                match catalog.songs.get(&song_id).await {
                    Some(s) => show(console, &s)?,
                    None => console.say("Song not found.")?,
                }
            }
            2 => {
                let song_id = console.ask("Enter Song ID to update: ")?;
                console.say(SKIP_HINT)?;
                let changes = SongUpdate {
                    title: console.ask_optional("New Title: ")?,
                    duration: seconds(console.ask_optional("New Duration in seconds: ")?),
                    artist_id: console.ask_optional("New Artist ID (optional): ")?,
                    genre_id: console.ask_optional("New Genre ID (optional): ")?,
                };
                let updated = catalog.songs.update(&song_id, &changes).await;
                console.say(if updated { "Song updated." } else { "Update failed." })?;
            }
            3 => {
                let song_id = console.ask("Enter Song ID to delete: ")?;
                if console.confirm(DELETE_PROMPT)? {
                    let deleted = catalog.songs.delete(&song_id).await;
                    console.say(if deleted { "Song deleted." } else { "Delete failed." })?;
                } else {
                    console.say("Delete cancelled.")?;
                }
            }
            4 => {
                let songs = catalog.songs.list().await;
                console.say(format!("Total songs: {}", songs.len()))?;
                for s in songs {
                    console.say(format!(
                        "- ID: {}, Title: {}, Duration: {}, Artist ID: {}, Genre ID: {}",
                        s.song_id,
                        s.title,
                        s.duration_label(),
                        or_none(s.artist_id.as_deref()),
                        or_none(s.genre_id.as_deref())
                    ))?;
                }
            }
            _ => break,
        }
    }
    Ok(())
}

async fn artist_menu<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
) -> Result<()> {
    const OPTIONS: [&str; 6] = [
        "Create Artist",
        "Get Artist by ID",
        "Update Artist",
        "Delete Artist",
        "List All Artists",
        "Back to Main Menu",
    ];

    while let Some(choice) = console.choose("Artist Management", &OPTIONS)? {
        match choice {
            0 => {
                let name = console.ask("Enter Artist Name: ")?;
                let description = console.ask_optional("Enter Description (optional): ")?;
                match catalog
                    .artists
                    .create(&NewArtist::new(&name, description.as_deref()))
                    .await
                {
                    Some(a) => console.say(format!("Artist created! Artist ID: {}", a.artist_id))?,
                    None => console.say("Failed to create artist.")?,
                }
            }
            1 => {
                let artist_id = console.ask("Enter Artist ID: ")?;
                match catalog.artists.get(&artist_id).await {
                    Some(a) => show(console, &a)?,
                    None => console.say("Artist not found.")?,
                }
            }
            2 => {
                let artist_id = console.ask("Enter Artist ID to update: ")?;
                console.say(SKIP_HINT)?;
                let changes = ArtistUpdate {
                    name: console.ask_optional("New Artist Name: ")?,
                    description: console.ask_optional("New Description: ")?,
                };
                let updated = catalog.artists.update(&artist_id, &changes).await;
                console.say(if updated { "Artist updated." } else { "Update failed." })?;
            }
            3 => {
                let artist_id = console.ask("Enter Artist ID to delete: ")?;
                if console.confirm(DELETE_PROMPT)? {
                    let deleted = catalog.artists.delete(&artist_id).await;
                    console.say(if deleted { "Artist deleted." } else { "Delete failed." })?;
                } else {
                    console.say("Delete cancelled.")?;
                }
            }
            4 => {
                let artists = catalog.artists.list().await;
                console.say(format!("Total artists: {}", artists.len()))?;
                for a in artists {
                    console.say(format!(
                        "- ID: {}, Name: {}, Description: {}",
                        a.artist_id,
                        a.name,
                        or_none(a.description.as_deref())
                    ))?;
                }
            }
            _ => break,
        }
    }
    Ok(())
}

async fn report_menu<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
) -> Result<()> {
    const OPTIONS: [&str; 3] = [
        "User Count by Role",
        "Playlist Count by Mood",
        "Back to Main Menu",
    ];

    while let Some(choice) = console.choose("Reports Menu", &OPTIONS)? {
        match choice {
            0 => {
                let data = catalog.reports.count_users_by_role().await;
                if data.is_empty() {
                    console.say("No data available.")?;
                } else {
                    console.say("User counts by role:")?;
                    for item in data {
                        console.say(format!("- Role: {}, Count: {}", item.role, item.count))?;
                    }
                }
            }
            1 => {
                let data = catalog.reports.count_playlists_by_mood().await;
                if data.is_empty() {
                    console.say("No data available.")?;
                } else {
                    console.say("Playlist counts by mood:")?;
                    for item in data {
                        console.say(format!(
                            "- Mood ID: {}, Count: {}",
                            or_none(item.mood_id.as_deref()),
                            item.count
                        ))?;
                    }
                }
            }
            _ => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_catalog;
    use crate::ui::console::tests::{scripted, transcript};

    #[test]
    fn test_seconds() {
        assert_eq!(seconds(Some("180".into())), Some(180));
        assert_eq!(seconds(Some("-3".into())), None);
        assert_eq!(seconds(Some("abc".into())), None);
        assert_eq!(seconds(None), None);
    }

    #[tokio::test]
    async fn test_user_management_session() {
        let catalog = memory_catalog().await;
        let mut console = scripted(&[
            "1", "1", "ana", "a@x.com", "secret", "",
            "1", "dup", "a@x.com", "secret", "Admin",
            "1", "bad", "b@x.com", "secret", "Boss",
            "5", "6", "8",
        ]);

        main_menu(&mut console, &catalog, "salt").await.unwrap();
        let out = transcript(console);

        assert_eq!(out.matches("User created successfully! User ID: ").count(), 1);
        assert!(out.contains("Error creating user."));
        assert!(out.contains("Error creating user: role must be User or Admin, not 'boss'"));
        assert!(out.contains("Total users: 1"));
        assert!(out.contains("Username: ana, Email: a@x.com, Role: User"));
        assert!(out.contains("Exiting..."));

        let stored = catalog.users.get_by_email("a@x.com").await.unwrap();
        assert_eq!(stored.password_hash, Some(hash_password("secret", "salt")));
    }

    #[tokio::test]
    async fn test_delete_needs_confirmation() {
        let catalog = memory_catalog().await;
        let mood = catalog.moods.create(&NewMood::new("Calm", "")).await.unwrap();

        let mut console = scripted(&[
            "3", "4", &mood.mood_id, "n",
            "4", &mood.mood_id, "y",
            "4", &mood.mood_id, "y",
            "6",
        ]);
        main_menu(&mut console, &catalog, "salt").await.unwrap();
        let out = transcript(console);

        assert!(out.contains("Delete cancelled."));
        assert!(out.contains("Mood deleted."));
        assert!(out.contains("Delete failed."));
        assert!(catalog.moods.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_songs_in_playlists() {
        let catalog = memory_catalog().await;
        let user = catalog
            .users
            .create(&NewUser::new("u", "u@x.com", "h"))
            .await
            .unwrap();
        let playlist = catalog
            .playlists
            .create(&NewPlaylist::new(&user.user_id, "Mix"))
            .await
            .unwrap();
        let song = catalog.songs.create(&NewSong::new("Song A")).await.unwrap();

        let mut console = scripted(&[
            "4",
            "1", &playlist.playlist_id, &song.song_id,
            "1", &playlist.playlist_id, &song.song_id,
            "3", &playlist.playlist_id,
            "4", &song.song_id,
            "2", &playlist.playlist_id, &song.song_id,
            "3", &playlist.playlist_id,
            "4", &song.song_id,
            "5", "8",
        ]);
        main_menu(&mut console, &catalog, "salt").await.unwrap();
        let out = transcript(console);

        assert!(out.contains("Song added to playlist."));
        assert!(out.contains("Failed to add song."));
        assert!(out.contains(&format!("- Song ID: {}, Title: Song A", song.song_id)));
        assert!(out.contains("Song removed from playlist."));
        assert!(out.contains("No songs found or playlist is empty."));
        assert!(out.contains(&format!("- Playlist ID: {}, Name: Mix", playlist.playlist_id)));
        assert!(out.contains("No playlists contain this song."));
    }

    #[tokio::test]
    async fn test_invalid_choice_and_end_of_input() {
        let catalog = memory_catalog().await;
        let mut console = scripted(&["0", "7", "1"]);

        main_menu(&mut console, &catalog, "salt").await.unwrap();
        let out = transcript(console);

        assert!(out.contains("Invalid choice. Please enter a number from 1 to 8."));
        assert!(out.contains("Reports Menu"));
        assert!(out.contains("No data available."));
    }
}
