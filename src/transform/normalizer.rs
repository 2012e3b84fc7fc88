use serde::Serialize;

use crate::catalog::record::RawRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRow {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub culture: Option<String>,
    pub period: Option<String>,
    pub century: Option<String>,
    pub medium: Option<String>,
    pub dimensions: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub classification: Option<String>,
    pub accessionyear: Option<i64>,
    pub accessionmethod: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRow {
    pub objectid: Option<i64>,
    pub imagecount: Option<i64>,
    pub mediacount: Option<i64>,
    /// Number of colors on the source record, counted here.
    pub colorcount: i64,
    pub rank: Option<f64>,
    pub datebegin: Option<i64>,
    pub dateend: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorRow {
    pub objectid: Option<i64>,
    pub color: Option<String>,
    pub spectrum: Option<String>,
    pub hue: Option<String>,
    pub percent: Option<f64>,
    pub css3: Option<String>,
}

/// Row sets produced from one fetch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedBatch {
    pub metadata: Vec<MetadataRow>,
    pub media: Vec<MediaRow>,
    pub colors: Vec<ColorRow>,
}

impl NormalizedBatch {
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty() && self.media.is_empty() && self.colors.is_empty()
    }
}

/// Flattens raw records into the three table shapes. Every record yields one
/// metadata row and one media row; nothing is dropped.
pub fn normalize(records: &[RawRecord]) -> NormalizedBatch {
    let mut batch = NormalizedBatch {
        metadata: Vec::with_capacity(records.len()),
        media: Vec::with_capacity(records.len()),
        colors: Vec::new(),
    };

    for r in records {
        batch.metadata.push(MetadataRow {
            id: r.id,
            title: r.title.clone(),
            culture: r.culture.clone(),
            period: r.period.clone(),
            century: r.century.clone(),
            medium: r.medium.clone(),
            dimensions: r.dimensions.clone(),
            description: r.description.clone(),
            department: r.department.clone(),
            classification: r.classification.clone(),
            accessionyear: r.accessionyear,
            accessionmethod: r.accessionmethod.clone(),
        });

        batch.media.push(MediaRow {
            objectid: r.id,
            imagecount: r.imagecount,
            mediacount: r.mediacount,
            colorcount: r.colors.len() as i64,
            rank: r.rank,
            datebegin: r.datebegin,
            dateend: r.dateend,
        });

        batch.colors.extend(r.colors.iter().map(|c| ColorRow {
            objectid: r.id,
            color: c.color.clone(),
            spectrum: c.spectrum.clone(),
            hue: c.hue.clone(),
            percent: c.percent,
            css3: c.css3.clone(),
        }));
    }

    batch
}
