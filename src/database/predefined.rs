/// Named, parameterless queries shipped with the archive, in menu order.
pub const PREDEFINED_QUERIES: [(&str, &str); 20] = [
    (
        "Artifacts from 11th century & Byzantine culture",
        "SELECT * FROM artifact_metadata WHERE century LIKE '%11th%' AND culture LIKE '%Byzantine%';",
    ),
    (
        "Artifacts count per department",
        "SELECT department, COUNT(*) as cnt FROM artifact_metadata GROUP BY department;",
    ),
    (
        "Top 5 most used colors",
        "SELECT color, COUNT(*) as freq FROM artifact_colors GROUP BY color ORDER BY freq DESC LIMIT 5;",
    ),
    (
        "Artifacts per classification + avg media count",
        "SELECT classification, COUNT(*) as cnt, AVG(mediacount) as avg_media FROM artifact_metadata meta JOIN artifact_media m ON meta.id=m.objectid GROUP BY classification;",
    ),
    (
        "Artifacts created between 1200 and 1500",
        "SELECT * FROM artifact_media WHERE datebegin>=1200 AND dateend<=1500;",
    ),
    (
        "Top 10 cultures by artifact count",
        "SELECT culture, COUNT(*) as cnt FROM artifact_metadata GROUP BY culture ORDER BY cnt DESC LIMIT 10;",
    ),
    (
        "Artifacts with missing description",
        "SELECT * FROM artifact_metadata WHERE description IS NULL OR description='';",
    ),
    (
        "Artifacts with dimensions info",
        "SELECT * FROM artifact_metadata WHERE dimensions IS NOT NULL LIMIT 10;",
    ),
    (
        "Artifacts ranked highest",
        "SELECT id, title, rank FROM artifact_metadata meta JOIN artifact_media m ON meta.id=m.objectid ORDER BY rank DESC LIMIT 10;",
    ),
    (
        "Average colors per artifact",
        "SELECT AVG(colorcount) as avg_colors FROM artifact_media;",
    ),
    (
        "Most frequent medium",
        "SELECT medium, COUNT(*) as cnt FROM artifact_metadata GROUP BY medium ORDER BY cnt DESC LIMIT 5;",
    ),
    (
        "Artifacts per century",
        "SELECT century, COUNT(*) as cnt FROM artifact_metadata GROUP BY century ORDER BY cnt DESC;",
    ),
    (
        "Departments with >100 artifacts",
        "SELECT department, COUNT(*) as cnt FROM artifact_metadata GROUP BY department HAVING cnt>100;",
    ),
    (
        "Top 5 accessions by year",
        "SELECT accessionyear, COUNT(*) as cnt FROM artifact_metadata GROUP BY accessionyear ORDER BY cnt DESC LIMIT 5;",
    ),
    (
        "Artifacts without accession method",
        "SELECT * FROM artifact_metadata WHERE accessionmethod IS NULL OR accessionmethod='';",
    ),
    (
        "Classification distribution",
        "SELECT classification, COUNT(*) as cnt FROM artifact_metadata GROUP BY classification;",
    ),
    (
        "Artifacts per color spectrum",
        "SELECT spectrum, COUNT(*) as cnt FROM artifact_colors GROUP BY spectrum;",
    ),
    (
        "Artifacts with more than 3 colors",
        "SELECT m.objectid, meta.title, m.colorcount FROM artifact_media m JOIN artifact_metadata meta ON m.objectid=meta.id WHERE colorcount>3;",
    ),
    (
        "Earliest artifacts by datebegin",
        "SELECT meta.id, meta.title, m.datebegin FROM artifact_metadata meta JOIN artifact_media m ON meta.id=m.objectid ORDER BY m.datebegin ASC LIMIT 10;",
    ),
    (
        "Latest artifacts by dateend",
        "SELECT meta.id, meta.title, m.dateend FROM artifact_metadata meta JOIN artifact_media m ON meta.id=m.objectid ORDER BY m.dateend DESC LIMIT 10;",
    ),
];

/// Shown after a load so the caller can eyeball what landed.
pub const RECENT_METADATA: &str = "SELECT * FROM artifact_metadata ORDER BY id DESC LIMIT 10;";

pub fn lookup(label: &str) -> Option<&'static str> {
    PREDEFINED_QUERIES
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, sql)| *sql)
}

pub fn labels() -> impl Iterator<Item = &'static str> {
    PREDEFINED_QUERIES.iter().map(|(name, _)| *name)
}
