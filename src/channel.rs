use serde::{Deserialize, Serialize};

/// Reachability of a channel's stream URL, as last observed by the prober.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    #[default]
    Unknown,
    Working,
    Error,
    Checking,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    UHD4K,
    FHD,
    HD,
    SD,
    #[default]
    Unknown,
}

impl Quality {
    pub fn badge(&self) -> &'static str {
        match self {
            Quality::UHD4K => "4K",
            Quality::FHD => "FHD",
            Quality::HD => "HD",
            Quality::SD => "SD",
            Quality::Unknown => "Unknown",
        }
    }
}

/// Heuristic content category derived from the channel name and group title.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sport,
    News,
    Music,
    Movies,
    Kids,
    Documentary,
    Entertainment,
    Adult,
    Religious,
    Shopping,
    #[default]
    General,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Sport => "sport",
            Category::News => "news",
            Category::Music => "music",
            Category::Movies => "movies",
            Category::Kids => "kids",
            Category::Documentary => "documentary",
            Category::Entertainment => "entertainment",
            Category::Adult => "adult",
            Category::Religious => "religious",
            Category::Shopping => "shopping",
            Category::General => "general",
        }
    }
}

/// Broad media kind of a channel (television, radio, ...).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelKind {
    #[default]
    Tv,
    Radio,
    Movie,
    Series,
    Sport,
    News,
    Music,
    Kids,
    Adult,
    Other,
}

impl ChannelKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelKind::Tv => "TV",
            ChannelKind::Radio => "Radio",
            ChannelKind::Movie => "Movie",
            ChannelKind::Series => "Series",
            ChannelKind::Sport => "Sport",
            ChannelKind::News => "News",
            ChannelKind::Music => "Music",
            ChannelKind::Kids => "Kids",
            ChannelKind::Adult => "Adult",
            ChannelKind::Other => "Other",
        }
    }
}

/// One playable playlist entry, parsed from an `#EXTINF` line and the URL
/// line that follows it, plus the classification derived at parse time.
///
/// `status` is the only field mutated after creation. Duplicate
/// `(name, url)` pairs are kept as separate entries; position in the
/// containing group is what tells them apart.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Channel {
    pub name: String,
    pub group: String,
    pub logo: String,
    pub url: String,
    #[serde(default)]
    pub status: ChannelStatus,

    // Raw tag attributes, kept verbatim when present.
    pub tvg_id: Option<String>,
    pub tvg_name: Option<String>,
    pub tvg_language: Option<String>,
    pub tvg_country: Option<String>,
    pub tvg_shift: Option<String>,
    pub group_title: Option<String>,
    #[serde(default)]
    pub radio_flag: bool,
    pub aspect_ratio: Option<String>,
    pub resolution: Option<String>,
    pub frame_rate: Option<String>,
    pub audio_codec: Option<String>,
    pub video_codec: Option<String>,

    // Derived classification.
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub quality: Quality,
    #[serde(default)]
    pub kind: ChannelKind,
    pub country: String,
    pub language: String,
}

/// One named bucket of an organized collection. Buckets and the channels
/// inside them are kept in locale-collated order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChannelGroup {
    pub key: String,
    pub channels: Vec<Channel>,
}

/// The full organized collection for one organization mode.
pub type OrganizedChannels = Vec<ChannelGroup>;

/// Key-selection strategy used to bucket channels for browsing.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationMode {
    #[default]
    Country,
    Category,
    Language,
    Quality,
    #[serde(rename = "type")]
    Kind,
    Alphabetical,
    Mixed,
}

impl OrganizationMode {
    pub fn all() -> &'static [OrganizationMode] {
        &[
            OrganizationMode::Country,
            OrganizationMode::Category,
            OrganizationMode::Language,
            OrganizationMode::Quality,
            OrganizationMode::Kind,
            OrganizationMode::Alphabetical,
            OrganizationMode::Mixed,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrganizationMode::Country => "Par pays",
            OrganizationMode::Category => "Par catégorie",
            OrganizationMode::Language => "Par langue",
            OrganizationMode::Quality => "Par qualité",
            OrganizationMode::Kind => "Par type",
            OrganizationMode::Alphabetical => "Alphabétique",
            OrganizationMode::Mixed => "Vue mixte",
        }
    }

    /// Stable identifier, also used for the persisted preference.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationMode::Country => "country",
            OrganizationMode::Category => "category",
            OrganizationMode::Language => "language",
            OrganizationMode::Quality => "quality",
            OrganizationMode::Kind => "type",
            OrganizationMode::Alphabetical => "alphabetical",
            OrganizationMode::Mixed => "mixed",
        }
    }

    pub fn parse(s: &str) -> Option<OrganizationMode> {
        OrganizationMode::all()
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
    }
}

/// Find a group by key in an organized collection.
pub fn find_group<'a>(organized: &'a OrganizedChannels, key: &str) -> Option<&'a ChannelGroup> {
    organized.iter().find(|g| g.key == key)
}

/// Flatten an organized collection back into a single channel list.
pub fn flatten(organized: &OrganizedChannels) -> Vec<Channel> {
    organized
        .iter()
        .flat_map(|g| g.channels.iter().cloned())
        .collect()
}
