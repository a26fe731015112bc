use serde::{Deserialize, Serialize};

/// Marker of the app-scoped shared media area; the path segment after it names the app
pub const APP_MEDIA_MARKER: &str = "/Android/media/";

/// What a matching row maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketTarget {
    /// A fixed relative bucket path ("DCIM/Camera/")
    Fixed(String),
    /// "Android/media/<app id>/", with the app id taken from the path
    AppScoped,
}

/// One row of the bucket table: a path fragment and the bucket it implies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRule {
    pub marker: String,
    pub target: BucketTarget,
}

/// Extra row supplied through configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRow {
    pub prefix: String,
    pub bucket: String,
}

/// Ordered table of path markers. The first row whose marker occurs in the path wins,
/// so more specific rows must come before the general ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketTable {
    rules: Vec<BucketRule>,
}

impl BucketRule {
    pub fn fixed(marker: &str, bucket: &str) -> Self {
        Self {
            marker: marker.to_string(),
            target: BucketTarget::Fixed(bucket.to_string()),
        }
    }
}

impl Default for BucketTable {
    fn default() -> Self {
        Self {
            rules: vec![
                BucketRule::fixed("/DCIM/Camera/", "DCIM/Camera/"),
                BucketRule::fixed("/DCIM/Restored/", "DCIM/Restored/"),
                BucketRule::fixed("/DCIM/", "DCIM/"),
                BucketRule::fixed("/Pictures/", "Pictures/"),
                BucketRule::fixed("/Movies/", "Movies/"),
                BucketRule::fixed("/Download/", "Download/"),
                BucketRule {
                    marker: APP_MEDIA_MARKER.to_string(),
                    target: BucketTarget::AppScoped,
                },
            ],
        }
    }
}

impl BucketTable {
    /// Built-in rows followed by configured extras
    pub fn with_extra(extra: &[BucketRow]) -> Self {
        let mut table = Self::default();
        for row in extra {
            table.push(BucketRule::fixed(&row.prefix, &row.bucket));
        }
        table
    }

    pub fn push(&mut self, rule: BucketRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[BucketRule] {
        &self.rules
    }

    /// Derive the bucket for an absolute path, or None when no row matches
    pub fn bucket_for(&self, path: &str) -> Option<String> {
        let rule = self.rules.iter().find(|r| path.contains(&r.marker))?;
        match &rule.target {
            BucketTarget::Fixed(bucket) => Some(bucket.clone()),
            BucketTarget::AppScoped => app_scoped_bucket(path),
        }
    }
}

// "/storage/emulated/0/Android/media/com.whatsapp/WhatsApp/x.mp4" -> "Android/media/com.whatsapp/"
fn app_scoped_bucket(path: &str) -> Option<String> {
    let (_, after) = path.split_once(APP_MEDIA_MARKER)?;
    let (app_id, _) = after.split_once('/')?;
    if app_id.is_empty() {
        return None;
    }
    Some(format!("Android/media/{}/", app_id))
}
