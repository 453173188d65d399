//! Mood-tagged track collection from the music API.
//!
//! Searches playlists by mood keyword, pages through their items, resolves
//! each track (and its primary artist) to a [`TrackRecord`]. Every API call
//! goes through the [`RetryPolicy`]; per-track and per-query failures are
//! logged and skipped so one bad entity never sinks a collection run.

pub mod retry;

use std::collections::HashSet;

use indicatif::{ProgressBar, ProgressStyle};

use crate::config::CollectConfig;
use crate::dataset::{TrackInfo, TrackRecord};
use crate::spotify::dto::{CreatedPlaylist, PlaylistItem, PlaylistSummary};
use crate::spotify::{ApiError, MusicApi};

use self::retry::{RetryPolicy, Sleeper, ThreadSleeper};

pub struct Collector<A: MusicApi, S: Sleeper = ThreadSleeper> {
    api: A,
    retry: RetryPolicy,
    settings: CollectConfig,
    sleeper: S,
}

impl<A: MusicApi> Collector<A> {
    pub fn new(api: A, retry: RetryPolicy, settings: CollectConfig) -> Self {
        Self::with_sleeper(api, retry, settings, ThreadSleeper)
    }
}

impl<A: MusicApi, S: Sleeper> Collector<A, S> {
    pub fn with_sleeper(api: A, retry: RetryPolicy, settings: CollectConfig, sleeper: S) -> Self {
        Self {
            api,
            retry,
            settings,
            sleeper,
        }
    }

    /// Fetch a track and its first artist's details.
    ///
    /// `Ok(None)` when the track does not exist. A missing artist leaves the
    /// artist fields at zero.
    pub fn get_track_info(&mut self, track_id: &str) -> Result<Option<TrackInfo>, ApiError> {
        log::info!("Fetching track info for {track_id}");

        let Some(track) = self.retry.run(&self.sleeper, || self.api.track(track_id))? else {
            log::warn!("No track info found for {track_id}");
            return Ok(None);
        };

        let artist = match track.artists.first().and_then(|a| a.id.clone()) {
            Some(artist_id) => self.retry.run(&self.sleeper, || self.api.artist(&artist_id))?,
            None => None,
        };

        track.into_track_info(artist.as_ref()).map(Some)
    }

    /// Search playlists with four query variants, deduplicated by id.
    /// Never fails: a query that errors or returns no playlist block is skipped.
    pub fn search_playlists_by_mood(&mut self, mood: &str, limit: usize) -> Vec<PlaylistSummary> {
        let queries = [
            format!("mood {mood}"),
            format!("{mood} music"),
            format!("{mood} songs"),
            format!("{mood} playlist"),
        ];

        let mut seen: HashSet<String> = HashSet::new();
        let mut found = Vec::new();

        for query in &queries {
            log::info!("Searching with query: {query}");
            let result = match self.retry.run(&self.sleeper, || self.api.search_playlists(query, limit)) {
                Ok(r) => r,
                Err(e) => {
                    log::error!("Error processing query '{query}': {e}");
                    continue;
                }
            };

            let Some(page) = result.playlists else {
                log::warn!("No results for query: {query}");
                continue;
            };

            let playlists: Vec<PlaylistSummary> = page.items.into_iter().flatten().collect();
            log::info!("Found {} playlists for query: {query}", playlists.len());

            for playlist in playlists {
                if seen.insert(playlist.id.clone()) {
                    found.push(playlist);
                }
            }
        }

        log::info!("Found {} unique playlists for mood: {mood}", found.len());
        found.truncate(limit);
        found
    }

    /// Page through a playlist's items, stopping at the configured cap.
    pub fn get_playlist_tracks(&mut self, playlist_id: &str) -> Vec<PlaylistItem> {
        log::info!("Fetching tracks from playlist {playlist_id}");
        let cap = self.settings.playlist_track_cap;

        let first = match self.retry.run(&self.sleeper, || self.api.playlist_tracks(playlist_id)) {
            Ok(page) => page,
            Err(e) => {
                log::error!("Error fetching tracks from playlist {playlist_id}: {e}");
                return Vec::new();
            }
        };

        log::debug!("Playlist {playlist_id} has {} tracks", first.total);
        let mut items = first.items;
        let mut next = first.next;
        if items.is_empty() && next.is_none() {
            log::warn!("No tracks found in playlist {playlist_id}");
        }

        while let Some(url) = next.take() {
            if items.len() >= cap {
                break;
            }
            self.sleeper.sleep(self.settings.page_delay());
            match self.retry.run(&self.sleeper, || self.api.next_page(&url)) {
                Ok(page) => {
                    items.extend(page.items);
                    next = page.next;
                }
                Err(e) => {
                    log::error!("Error fetching next page of playlist {playlist_id}: {e}");
                    break;
                }
            }
        }

        items.truncate(cap);
        items
    }

    /// Collect up to `num_tracks` records for one mood.
    pub fn collect_mood_data(&mut self, mood: &str, num_tracks: usize) -> Vec<TrackRecord> {
        let mut tracks: Vec<TrackRecord> = Vec::new();
        let playlists = self.search_playlists_by_mood(mood, self.settings.playlists_per_mood);

        let pb = progress_bar(playlists.len(), &format!("playlists ({mood})"));

        'playlists: for playlist in &playlists {
            if tracks.len() >= num_tracks {
                break;
            }
            pb.set_message(playlist.name.clone());

            for item in self.get_playlist_tracks(&playlist.id) {
                if tracks.len() >= num_tracks {
                    break 'playlists;
                }
                let Some(track) = item.track else {
                    continue;
                };
                let Some(track_id) = track.id else {
                    log::debug!("Skipping local track: {}", track.name);
                    continue;
                };

                match self.get_track_info(&track_id) {
                    Ok(Some(info)) => {
                        tracks.push(info.into_record(mood));
                        self.sleeper.sleep(self.settings.track_delay());
                    }
                    Ok(None) => {}
                    Err(e) => log::error!("Error fetching track info for {track_id}: {e}"),
                }
            }

            pb.inc(1);
        }

        pb.finish_with_message("done");
        log::info!("Collected {} tracks for mood: {mood}", tracks.len());
        tracks
    }

    /// Collect every mood in order into one table.
    pub fn collect_all_mood_data(&mut self, moods: &[String]) -> Vec<TrackRecord> {
        let mut all = Vec::new();
        let per_mood = self.settings.tracks_per_mood;

        let pb = progress_bar(moods.len(), "moods");
        for mood in moods {
            pb.set_message(mood.clone());
            all.extend(self.collect_mood_data(mood, per_mood));
            pb.inc(1);
        }
        pb.finish_with_message("done");

        all
    }

    /// Create a public playlist for the current user and add the tracks in
    /// batches.
    pub fn create_playlist(
        &mut self,
        name: &str,
        description: &str,
        tracks: &[TrackRecord],
    ) -> Result<CreatedPlaylist, ApiError> {
        let user = self.retry.run(&self.sleeper, || self.api.current_user())?;
        log::info!(
            "Creating playlist '{name}' for {}",
            user.display_name.as_deref().unwrap_or(&user.id)
        );
        let playlist = self.retry.run(&self.sleeper, || {
            self.api.create_playlist(&user.id, name, description, true)
        })?;

        let uris: Vec<String> = tracks
            .iter()
            .map(|t| format!("spotify:track:{}", t.id))
            .collect();

        for chunk in uris.chunks(self.settings.batch_size.max(1)) {
            self.retry
                .run(&self.sleeper, || self.api.add_playlist_items(&playlist.id, chunk))?;
            self.sleeper.sleep(self.settings.batch_delay());
        }

        log::info!("Created playlist: {}", playlist.name);
        if let Some(url) = playlist.url() {
            log::info!("Playlist URL: {url}");
        }
        Ok(playlist)
    }

    /// [`Self::create_playlist`], with a failure logged instead of returned.
    /// The local CSV is the fallback, so a failed upload is not fatal.
    pub fn upload_playlist(
        &mut self,
        name: &str,
        description: &str,
        tracks: &[TrackRecord],
    ) -> Option<CreatedPlaylist> {
        match self.create_playlist(name, description, tracks) {
            Ok(playlist) => Some(playlist),
            Err(e) => {
                log::error!("Failed to create Spotify playlist: {e}");
                None
            }
        }
    }
}

fn progress_bar(len: usize, unit: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let template = format!("{{spinner:.green}} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {unit} {{msg}}");
    pb.set_style(
        ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}
