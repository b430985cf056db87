//! Extension to read the playlist settings from gdmconfig

use crate::store::DEFAULT_STORE_NAME;
use gdmconfig::Config;

pub trait PlaylistConfigExt {
    /// Store (namespace) holding the persisted playlist
    fn get_playlist_store_name(&self) -> String;
}

impl PlaylistConfigExt for Config {
    fn get_playlist_store_name(&self) -> String {
        self.get_string_or(&["playlist", "store_name"], DEFAULT_STORE_NAME)
    }
}
