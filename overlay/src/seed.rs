//! Danmaku sources for the demo host
//!
//! Either random comments spread over the timeline, or a JSON export of
//! recorded comments.

use std::path::Path;

use danmaku_core::DanmakuSpec;
use danmaku_types::{Color, danmaku_colors};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SAMPLE_TEXTS: &[&str] = &[
    "awsl", "前方高能", "哈哈哈哈哈", "名场面", "打卡", "泪目", "好家伙", "来了来了", "下次一定",
    "爷青回", "妙啊", "这就是专业", "弹幕护体", "空降成功", "高能预警", "又是你", "6666",
    "真香", "全体起立", "梦开始的地方",
];

const SIZE_RANGE: std::ops::Range<f32> = 30.0..60.0;
const LANE_RANGE: std::ops::Range<f32> = 100.0..800.0;
const SPEED_RANGE: std::ops::Range<f32> = 0.3..1.8;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One recorded comment in an import file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DanmakuRecord {
    pub content: String,
    #[serde(default = "default_record_size")]
    pub size: f32,
    #[serde(default = "default_record_color")]
    pub color: Color,
    #[serde(default)]
    pub appear_ms: u64,
    #[serde(default = "default_record_speed")]
    pub speed: f32,
    /// Lane; random when absent
    #[serde(default)]
    pub y: Option<f32>,
}

fn default_record_size() -> f32 {
    40.0
}
fn default_record_color() -> Color {
    danmaku_colors::WHITE
}
fn default_record_speed() -> f32 {
    1.0
}

impl DanmakuRecord {
    pub fn into_spec(self, rng: &mut impl Rng) -> DanmakuSpec {
        let y = self.y.unwrap_or_else(|| rng.random_range(LANE_RANGE));
        DanmakuSpec::new(self.content, self.size, self.color, y)
            .with_speed(self.speed)
            .with_appear_time(self.appear_ms)
    }
}

/// A random comment appearing somewhere within `duration_ms`
pub fn random_spec(rng: &mut impl Rng, duration_ms: u64) -> DanmakuSpec {
    let text = SAMPLE_TEXTS[rng.random_range(0..SAMPLE_TEXTS.len())];
    let color = danmaku_colors::ALL[rng.random_range(0..danmaku_colors::ALL.len())];

    DanmakuSpec::new(
        text,
        rng.random_range(SIZE_RANGE),
        color,
        rng.random_range(LANE_RANGE),
    )
    .with_speed(rng.random_range(SPEED_RANGE))
    .with_appear_time(rng.random_range(0..duration_ms.max(1)))
}

pub fn random_specs(count: usize, duration_ms: u64) -> Vec<DanmakuSpec> {
    let mut rng = rand::rng();
    (0..count).map(|_| random_spec(&mut rng, duration_ms)).collect()
}

pub fn parse_records(json: &str) -> Result<Vec<DanmakuRecord>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Read a JSON array of [`DanmakuRecord`]s and turn them into specs
pub fn load_records(path: &Path) -> Result<Vec<DanmakuSpec>, SeedError> {
    let json = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let records = parse_records(&json).map_err(|source| SeedError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    tracing::info!(path = %path.display(), records = records.len(), "Loaded danmaku records");

    let mut rng = rand::rng();
    Ok(records
        .into_iter()
        .map(|record| record.into_spec(&mut rng))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_spec_ranges() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let spec = random_spec(&mut rng, 10_000);
            assert!(SIZE_RANGE.contains(&spec.size));
            assert!(LANE_RANGE.contains(&spec.y));
            assert!(SPEED_RANGE.contains(&spec.relative_speed));
            assert!(spec.appear_time_ms < 10_000);
            assert!(SAMPLE_TEXTS.contains(&spec.text.as_str()));
        }
    }

    #[test]
    fn test_random_specs_zero_duration() {
        let specs = random_specs(3, 0);
        assert_eq!(specs.len(), 3);
        assert!(specs.iter().all(|s| s.appear_time_ms == 0));
    }

    #[test]
    fn test_parse_records_with_defaults() {
        let records = parse_records(
            r#"[
                {"content": "first", "size": 36.0, "color": [255, 0, 0, 255], "appear_ms": 1500, "speed": 1.2, "y": 240.0},
                {"content": "bare"}
            ]"#,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].size, 40.0);
        assert_eq!(records[1].color, danmaku_colors::WHITE);
        assert_eq!(records[1].y, None);

        let spec = records[0].clone().into_spec(&mut rand::rng());
        assert_eq!(spec.y, 240.0);
        assert_eq!(spec.appear_time_ms, 1500);
        assert_eq!(spec.relative_speed, 1.2);
        assert_eq!(spec.progress_color, [255, 0, 0, 255]);
    }

    #[test]
    fn test_parse_records_rejects_object() {
        assert!(parse_records(r#"{"content": "x"}"#).is_err());
    }

    #[test]
    fn test_load_records_missing_file() {
        let err = load_records(Path::new("/nonexistent/danmaku.json")).unwrap_err();
        assert!(matches!(err, SeedError::Read { .. }));
    }
}
