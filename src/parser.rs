//! Extended-M3U parsing, metadata enrichment and channel organization.
//!
//! The playlist is alternating `#EXTINF` metadata lines and stream URL
//! lines. Tag attributes are extracted independently per attribute, so
//! their order within the line does not matter. Classification (category,
//! quality, kind, country, language) is driven by ordered pattern tables
//! evaluated top to bottom, first match wins.

use crate::channel::{
    Category, Channel, ChannelGroup, ChannelKind, ChannelStatus, OrganizationMode,
    OrganizedChannels, Quality,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Name used when an `#EXTINF` line carries no display name.
pub const UNKNOWN_CHANNEL_NAME: &str = "Chaîne inconnue";
/// Group used when an entry has no `group-title` attribute.
pub const UNGROUPED: &str = "Non classé";

pub(crate) static GROUP_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)group-title="([^"]*)""#).expect("group-title pattern"));

macro_rules! attr_re {
    ($attr:literal) => {
        Lazy::new(|| {
            Regex::new(concat!(r#"(?i)"#, $attr, r#"="([^"]*)""#)).expect("attribute pattern")
        })
    };
}

static TVG_ID_RE: Lazy<Regex> = attr_re!("tvg-id");
static TVG_NAME_RE: Lazy<Regex> = attr_re!("tvg-name");
static TVG_LOGO_RE: Lazy<Regex> = attr_re!("tvg-logo");
static TVG_LANGUAGE_RE: Lazy<Regex> = attr_re!("tvg-language");
static TVG_COUNTRY_RE: Lazy<Regex> = attr_re!("tvg-country");
static TVG_SHIFT_RE: Lazy<Regex> = attr_re!("tvg-shift");
static ASPECT_RATIO_RE: Lazy<Regex> = attr_re!("aspect-ratio");
static RESOLUTION_RE: Lazy<Regex> = attr_re!("resolution");
static FRAME_RATE_RE: Lazy<Regex> = attr_re!("frame-rate");
static AUDIO_CODEC_RE: Lazy<Regex> = attr_re!("audio-codec");
static VIDEO_CODEC_RE: Lazy<Regex> = attr_re!("video-codec");
static RADIO_FLAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)radio="true""#).expect("radio flag pattern"));

/// Category heuristics, evaluated in this priority order.
static CATEGORY_RULES: Lazy<Vec<(Category, Regex)>> = Lazy::new(|| {
    [
        (
            Category::Sport,
            r"sport|football|soccer|basketball|tennis|golf|hockey|racing|f1|formula|olympic",
        ),
        (
            Category::News,
            r"news|info|actualit|journal|bfm|cnn|bbc|france24|euronews",
        ),
        (
            Category::Music,
            r"music|mtv|mcm|trace|nrj|radio|fm|hits|rock|pop|jazz",
        ),
        (
            Category::Movies,
            r"cine|movie|film|cinema|paramount|warner|disney|netflix",
        ),
        (
            Category::Kids,
            r"kids|enfant|junior|cartoon|disney|nickelodeon|gulli|tiji",
        ),
        (
            Category::Documentary,
            r"doc|discovery|national|geographic|history|arte|planete",
        ),
        (
            Category::Entertainment,
            r"entertainment|divertissement|reality|show|comedy",
        ),
        (Category::Adult, r"adult|xxx|porn|sexy|hot|18\+"),
        (
            Category::Religious,
            r"relig|church|islam|christian|catholic|spiritual",
        ),
        (Category::Shopping, r"shop|shopping|teleachat|qvc|hsn"),
    ]
    .into_iter()
    .map(|(cat, pat)| {
        (
            cat,
            Regex::new(&format!("(?i){pat}")).expect("category pattern"),
        )
    })
    .collect()
});

/// Quality heuristics, best first.
static QUALITY_RULES: Lazy<Vec<(Quality, Regex)>> = Lazy::new(|| {
    [
        (Quality::UHD4K, r"4k|uhd|2160p"),
        (Quality::FHD, r"fhd|1080p|full.*hd"),
        (Quality::HD, r"hd|720p"),
        (Quality::SD, r"sd|480p|576p"),
    ]
    .into_iter()
    .map(|(q, pat)| {
        (
            q,
            Regex::new(&format!("(?i){pat}")).expect("quality pattern"),
        )
    })
    .collect()
});

static RADIO_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)radio|\bfm\b|\bam\b").expect("radio pattern"));

/// Group-title abbreviations and long-form aliases to display names.
const COUNTRY_TABLE: &[(&str, &str)] = &[
    ("fr", "France"),
    ("france", "France"),
    ("french", "France"),
    ("uk", "United Kingdom"),
    ("gb", "United Kingdom"),
    ("britain", "United Kingdom"),
    ("us", "United States"),
    ("usa", "United States"),
    ("america", "United States"),
    ("de", "Germany"),
    ("deutschland", "Germany"),
    ("german", "Germany"),
    ("es", "Spain"),
    ("spain", "Spain"),
    ("spanish", "Spain"),
    ("it", "Italy"),
    ("italia", "Italy"),
    ("italian", "Italy"),
    ("pt", "Portugal"),
    ("portugal", "Portugal"),
    ("portuguese", "Portugal"),
    ("br", "Brazil"),
    ("brasil", "Brazil"),
    ("brazil", "Brazil"),
    ("ca", "Canada"),
    ("canada", "Canada"),
    ("canadian", "Canada"),
];

const LANGUAGE_TABLE: &[(&str, &str)] = &[
    ("France", "Français"),
    ("United Kingdom", "English"),
    ("United States", "English"),
    ("Germany", "Deutsch"),
    ("Spain", "Español"),
    ("Italy", "Italiano"),
    ("Portugal", "Português"),
    ("Brazil", "Português"),
    ("Canada", "English/Français"),
];

#[derive(Debug, Default, Clone)]
pub(crate) struct ExtinfMetadata {
    pub tvg_id: Option<String>,
    pub tvg_name: Option<String>,
    pub tvg_logo: Option<String>,
    pub tvg_language: Option<String>,
    pub tvg_country: Option<String>,
    pub tvg_shift: Option<String>,
    pub group_title: Option<String>,
    pub radio_flag: bool,
    pub aspect_ratio: Option<String>,
    pub resolution: Option<String>,
    pub frame_rate: Option<String>,
    pub audio_codec: Option<String>,
    pub video_codec: Option<String>,
}

/// A parsed `#EXTINF` line, waiting for its URL line.
#[derive(Debug, Clone)]
pub(crate) struct PendingChannel {
    pub name: String,
    pub meta: ExtinfMetadata,
}

fn capture(re: &Regex, line: &str) -> Option<String> {
    re.captures(line).map(|c| c[1].to_string())
}

pub(crate) fn extract_metadata(line: &str) -> ExtinfMetadata {
    ExtinfMetadata {
        tvg_id: capture(&TVG_ID_RE, line),
        tvg_name: capture(&TVG_NAME_RE, line),
        tvg_logo: capture(&TVG_LOGO_RE, line),
        tvg_language: capture(&TVG_LANGUAGE_RE, line),
        tvg_country: capture(&TVG_COUNTRY_RE, line),
        tvg_shift: capture(&TVG_SHIFT_RE, line),
        group_title: capture(&GROUP_TITLE_RE, line),
        radio_flag: RADIO_FLAG_RE.is_match(line),
        aspect_ratio: capture(&ASPECT_RATIO_RE, line),
        resolution: capture(&RESOLUTION_RE, line),
        frame_rate: capture(&FRAME_RATE_RE, line),
        audio_codec: capture(&AUDIO_CODEC_RE, line),
        video_codec: capture(&VIDEO_CODEC_RE, line),
    }
}

/// The display name is everything after the *last* comma. Names that
/// themselves contain commas therefore lose their head ("Channel, Extra"
/// yields "Extra") — a known limitation of the format, reproduced as-is
/// because `#EXTINF` defines no alternate delimiter.
pub(crate) fn extract_name(line: &str) -> String {
    match line.rfind(',') {
        Some(idx) => {
            let name = line[idx + 1..].trim();
            if name.is_empty() {
                UNKNOWN_CHANNEL_NAME.to_string()
            } else {
                name.to_string()
            }
        }
        None => UNKNOWN_CHANNEL_NAME.to_string(),
    }
}

pub(crate) fn parse_extinf(line: &str) -> PendingChannel {
    PendingChannel {
        name: extract_name(line),
        meta: extract_metadata(line),
    }
}

pub(crate) fn detect_category(name: &str, group: &str) -> Category {
    let haystack = format!("{name} {group}");
    for (category, re) in CATEGORY_RULES.iter() {
        if re.is_match(&haystack) {
            return *category;
        }
    }
    Category::General
}

pub(crate) fn detect_quality(name: &str, resolution: Option<&str>) -> Quality {
    let haystack = format!("{name} {}", resolution.unwrap_or(""));
    for (quality, re) in QUALITY_RULES.iter() {
        if re.is_match(&haystack) {
            return *quality;
        }
    }
    Quality::Unknown
}

pub(crate) fn detect_kind(name: &str, group: &str, radio_flag: bool) -> ChannelKind {
    if radio_flag {
        return ChannelKind::Radio;
    }
    let haystack = format!("{name} {group}");
    for (category, re) in CATEGORY_RULES.iter() {
        if re.is_match(&haystack) {
            match category {
                Category::Sport => return ChannelKind::Sport,
                Category::News => return ChannelKind::News,
                Category::Music => return ChannelKind::Music,
                Category::Movies => return ChannelKind::Movie,
                Category::Kids => return ChannelKind::Kids,
                _ => break,
            }
        }
    }
    if RADIO_TEXT_RE.is_match(&haystack) {
        return ChannelKind::Radio;
    }
    ChannelKind::Tv
}

pub(crate) fn normalize_country(tvg_country: Option<&str>, group_title: Option<&str>) -> String {
    if let Some(country) = tvg_country.filter(|c| !c.is_empty()) {
        return country.to_string();
    }
    let group = match group_title.filter(|g| !g.is_empty()) {
        Some(g) => g,
        None => return "Unknown".to_string(),
    };
    let lower = group.to_lowercase();
    COUNTRY_TABLE
        .iter()
        .find(|(abbr, _)| *abbr == lower)
        .map(|(_, full)| full.to_string())
        .unwrap_or_else(|| group.to_string())
}

pub(crate) fn normalize_language(tvg_language: Option<&str>, country: &str) -> String {
    if let Some(language) = tvg_language.filter(|l| !l.is_empty()) {
        return language.to_string();
    }
    LANGUAGE_TABLE
        .iter()
        .find(|(c, _)| *c == country)
        .map(|(_, lang)| lang.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Combine a pending metadata line with its URL line into an enriched
/// channel record.
pub(crate) fn finish_channel(pending: PendingChannel, url: String) -> Channel {
    let PendingChannel { name, meta } = pending;
    let group = meta
        .group_title
        .clone()
        .unwrap_or_else(|| UNGROUPED.to_string());
    let category = detect_category(&name, meta.group_title.as_deref().unwrap_or(""));
    let quality = detect_quality(&name, meta.resolution.as_deref());
    let kind = detect_kind(
        &name,
        meta.group_title.as_deref().unwrap_or(""),
        meta.radio_flag,
    );
    let country = normalize_country(meta.tvg_country.as_deref(), meta.group_title.as_deref());
    let language = normalize_language(meta.tvg_language.as_deref(), &country);

    Channel {
        name,
        group,
        logo: meta.tvg_logo.unwrap_or_default(),
        url,
        status: ChannelStatus::Unknown,
        tvg_id: meta.tvg_id,
        tvg_name: meta.tvg_name,
        tvg_language: meta.tvg_language,
        tvg_country: meta.tvg_country,
        tvg_shift: meta.tvg_shift,
        group_title: meta.group_title,
        radio_flag: meta.radio_flag,
        aspect_ratio: meta.aspect_ratio,
        resolution: meta.resolution,
        frame_rate: meta.frame_rate,
        audio_codec: meta.audio_codec,
        video_codec: meta.video_codec,
        category,
        quality,
        kind,
        country,
        language,
    }
}

/// Scan the playlist into enriched channel records. Entries missing
/// either name or URL are dropped without raising; a metadata line with
/// no comma still counts as a channel attempt under the placeholder name.
pub fn parse_channels(text: &str) -> Vec<Channel> {
    let mut channels = Vec::new();
    let mut pending: Option<PendingChannel> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.starts_with("#EXTINF:") {
            pending = Some(parse_extinf(line));
        } else if !line.is_empty() && !line.starts_with('#') {
            if let Some(p) = pending.take() {
                channels.push(finish_channel(p, line.to_string()));
            } else {
                tracing::debug!(line, "URL sans ligne #EXTINF, entrée ignorée");
            }
        }
    }

    channels
}

/// Parse and organize in the default mode (by country).
pub fn parse(text: &str) -> OrganizedChannels {
    organize(&parse_channels(text), OrganizationMode::Country)
}

/// Collation key: lowercased with common Latin diacritics folded, so
/// "École" sorts with "Ecole" the way a French-locale compare would.
pub fn collate_key(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'à' | 'â' | 'ä' | 'á' | 'ã' | 'å' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' | 'í' | 'ì' => 'i',
            'ô' | 'ö' | 'ó' | 'ò' | 'õ' => 'o',
            'ù' | 'û' | 'ü' | 'ú' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            'ý' | 'ÿ' => 'y',
            other => other,
        })
        .collect()
}

fn collate_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    collate_key(a).cmp(&collate_key(b)).then_with(|| a.cmp(b))
}

/// The bucket key for one channel under `mode`.
pub fn group_key(channel: &Channel, mode: OrganizationMode) -> String {
    match mode {
        OrganizationMode::Category => channel.category.label().to_string(),
        OrganizationMode::Language => channel.language.clone(),
        OrganizationMode::Quality => channel.quality.badge().to_string(),
        OrganizationMode::Kind => channel.kind.label().to_string(),
        OrganizationMode::Alphabetical => channel
            .name
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_else(|| "#".to_string()),
        OrganizationMode::Mixed => format!("{} - {}", channel.country, channel.category.label()),
        OrganizationMode::Country => {
            if !channel.country.is_empty() {
                channel.country.clone()
            } else if !channel.group.is_empty() {
                channel.group.clone()
            } else {
                UNGROUPED.to_string()
            }
        }
    }
}

/// Regroup a channel set by `mode`. Pure: output depends only on the
/// channel set, never on any prior grouping. Keys and channels within
/// each bucket come out locale-collated.
pub fn organize(channels: &[Channel], mode: OrganizationMode) -> OrganizedChannels {
    let mut buckets: HashMap<String, Vec<Channel>> = HashMap::new();
    for channel in channels {
        buckets
            .entry(group_key(channel, mode))
            .or_default()
            .push(channel.clone());
    }

    let mut keys: Vec<String> = buckets.keys().cloned().collect();
    keys.sort_by(|a, b| collate_cmp(a, b));

    keys.into_iter()
        .map(|key| {
            let mut channels = buckets.remove(&key).unwrap_or_default();
            channels.sort_by(|a, b| collate_cmp(&a.name, &b.name));
            ChannelGroup { key, channels }
        })
        .collect()
}

/// Distinct-key count for one organization mode, as shown in the mode
/// picker. Alphabetical is reported as a fixed 26.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationInfo {
    pub mode: OrganizationMode,
    pub label: &'static str,
    pub count: usize,
}

/// Per-mode distinct-key counts. The caller is expected to hide modes
/// whose count is ≤ 1 (no meaningful grouping).
pub fn available_organizations(channels: &[Channel]) -> Vec<OrganizationInfo> {
    OrganizationMode::all()
        .iter()
        .map(|&mode| {
            let count = if mode == OrganizationMode::Alphabetical {
                26
            } else {
                channels
                    .iter()
                    .map(|c| group_key(c, mode))
                    .collect::<HashSet<_>>()
                    .len()
            };
            OrganizationInfo {
                mode,
                label: mode.label(),
                count,
            }
        })
        .collect()
}
