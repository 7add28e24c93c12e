use crate::Result;
use crate::provider::MetadataClient;
use crate::types::{MediaDetail, MediaType};
use tokio_util::sync::CancellationToken;

/// Expands a confirmed provider id into its full detail record plus the
/// flattened set of every alternate and translated title.
///
/// The detail record is returned alongside the names so a caller that
/// accepts the match can reuse it instead of re-querying.
pub(crate) struct AlternateTitleExpander<'a> {
    client: &'a dyn MetadataClient,
}

impl<'a> AlternateTitleExpander<'a> {
    pub fn new(client: &'a dyn MetadataClient) -> Self {
        Self { client }
    }

    /// Fetch the detail record for `id` and collect its alternate-title and
    /// translation names, deduplicated in first-seen order. Absent
    /// sub-resources yield an empty list, not an error.
    pub async fn expand(
        &self,
        media_type: MediaType,
        id: i64,
        cancel: &CancellationToken,
    ) -> Result<Option<(MediaDetail, Vec<String>)>> {
        let Some(detail) = self.client.get_detail(media_type, id, cancel).await? else {
            return Ok(None);
        };
        let names = collect_names(&detail);
        Ok(Some((detail, names)))
    }
}

fn collect_names(detail: &MediaDetail) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in detail
        .alternative_titles
        .iter()
        .chain(detail.translations.iter())
    {
        if !name.is_empty() && !names.contains(name) {
            names.push(name.clone());
        }
    }
    names
}
