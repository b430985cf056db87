//! `files` resource: listing audio files and downloading their content

use super::DriveApi;
use crate::error::Result;
use crate::models::{FileList, GoogleAudio, Token};
use bytes::Bytes;
use tracing::{debug, info};

const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,webViewLink)";

impl DriveApi {
    /// Search expression selecting the configured audio MIME types
    ///
    /// Trashed files are left out.
    pub fn audio_query(&self) -> String {
        let types = self
            .mime_types
            .iter()
            .map(|mime| format!("mimeType='{}'", mime.replace('\'', "\\'")))
            .collect::<Vec<_>>()
            .join(" or ");
        format!("({}) and trashed=false", types)
    }

    /// Lists every audio file visible with `token`, following pagination
    pub async fn list_audio_files(&self, token: &Token) -> Result<Vec<GoogleAudio>> {
        let query = self.audio_query();
        let page_size = self.page_size.to_string();
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(ref next) = page_token {
                params.push(("pageToken", next.as_str()));
            }

            let page: FileList = self.get_json(token, "/files", &params).await?;
            debug!("Received {} files", page.files.len());
            files.extend(page.files);

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        info!("Listed {} audio files from Drive", files.len());
        Ok(files)
    }

    /// Downloads the raw content of a file
    pub async fn download(&self, token: &Token, id: &str) -> Result<Bytes> {
        let endpoint = format!("/files/{}", id);
        let response = self.get(token, &endpoint, &[("alt", "media")]).await?;
        let content = response.bytes().await?;

        debug!(id, bytes = content.len(), "Downloaded file content");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_query() {
        let mut api = DriveApi::new().unwrap();
        api.set_mime_types(vec!["audio/mpeg".into(), "audio/flac".into()]);
        assert_eq!(
            api.audio_query(),
            "(mimeType='audio/mpeg' or mimeType='audio/flac') and trashed=false"
        );
    }
}
