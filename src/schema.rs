//! Fixed DDL for every artifact the pipeline writes.
//!
//! All artifacts are served as static files and read through HTTP range
//! requests, so they share one page size and no write-ahead log.

pub const PAGE_SIZE: u32 = 4096;

/// Applied right after opening, before any table exists, so the page size
/// sticks. Synchronous writes are off only while the artifact is disposable.
pub const BUILD_PRAGMAS: &str = "
    PRAGMA page_size = 4096;
    PRAGMA journal_mode = DELETE;
    PRAGMA synchronous = OFF;
";

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub name: &'static str,
    pub ddl: &'static str,
}

pub const QURAN: Schema = Schema {
    name: "quran",
    ddl: "
        CREATE TABLE ayahs (
            surah INTEGER,
            ayah  INTEGER,
            text  TEXT,
            PRIMARY KEY (surah, ayah)
        );
        CREATE INDEX idx_ayah_surah ON ayahs(surah);
    ",
};

pub const INFO: Schema = Schema {
    name: "info",
    ddl: "
        CREATE TABLE surahs (
            id           INTEGER PRIMARY KEY,
            name         TEXT,
            english_name TEXT,
            arabic_name  TEXT,
            revelation   TEXT,
            verse_count  INTEGER
        );

        CREATE TABLE verse_info (
            surah  INTEGER REFERENCES surahs(id),
            ayah   INTEGER,
            line   INTEGER,
            juz    INTEGER,
            manzil INTEGER,
            page   INTEGER,
            ruku   INTEGER,
            maqra  INTEGER,
            sajda  BOOLEAN,
            PRIMARY KEY (surah, ayah)
        );
        CREATE INDEX idx_verse_juz ON verse_info(juz);
        CREATE INDEX idx_verse_page ON verse_info(page);
    ",
};

pub const EDITION_INDEX: Schema = Schema {
    name: "editions index",
    ddl: "
        CREATE TABLE editions (
            id        INTEGER PRIMARY KEY,
            slug      TEXT UNIQUE,
            author    TEXT,
            language  TEXT,
            direction TEXT CHECK(direction IN ('ltr','rtl')),
            source    TEXT,
            note      TEXT,
            chunk_id  INTEGER
        );
        CREATE INDEX idx_editions_lang ON editions(language);
        CREATE INDEX idx_editions_chunk ON editions(chunk_id);
    ",
};

pub const EDITION_CHUNK: Schema = Schema {
    name: "editions chunk",
    ddl: "
        CREATE TABLE translations (
            edition_id INTEGER,
            surah      INTEGER,
            ayah       INTEGER,
            text       TEXT,
            PRIMARY KEY (edition_id, surah, ayah)
        );
        CREATE INDEX idx_trans_edition ON translations(edition_id);
        CREATE INDEX idx_trans_surah ON translations(surah);
    ",
};

pub const TAJWEED: Schema = Schema {
    name: "tajweed",
    ddl: "
        CREATE TABLE rules (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            surah     INTEGER,
            ayah      INTEGER,
            start_pos INTEGER,
            end_pos   INTEGER,
            rule_type TEXT
        );
        CREATE INDEX idx_tajweed_ayah ON rules(surah, ayah);
        CREATE INDEX idx_tajweed_rule ON rules(rule_type);
    ",
};

pub const GLYPHS: Schema = Schema {
    name: "tajweed glyphs",
    ddl: "
        CREATE TABLE glyphs (
            page       INTEGER,
            surah      INTEGER,
            ayah       INTEGER,
            glyph_text TEXT,
            PRIMARY KEY (page, surah, ayah)
        );
        CREATE INDEX idx_glyphs_page ON glyphs(page);
        CREATE INDEX idx_glyphs_surah ON glyphs(surah, ayah);
    ",
};

pub const MUTASHABIHAT: Schema = Schema {
    name: "mutashabihat",
    ddl: "
        CREATE TABLE similarities (
            id           INTEGER PRIMARY KEY,
            source_ref   TEXT,
            similar_refs TEXT
        );
        CREATE INDEX idx_similar_source ON similarities(source_ref);
    ",
};

pub const RECITATIONS: Schema = Schema {
    name: "recitations",
    ddl: "
        CREATE TABLE reciters (
            id          INTEGER PRIMARY KEY,
            name        TEXT,
            style       TEXT,
            verse_count INTEGER
        );
    ",
};

/// One commentary volume.
pub const TAFSIR_VOLUME: Schema = Schema {
    name: "tafsir volume",
    ddl: "
        CREATE TABLE metadata (
            key   TEXT PRIMARY KEY,
            value TEXT
        );

        CREATE TABLE ayahs (
            surah INTEGER,
            ayah  INTEGER,
            text  TEXT,
            PRIMARY KEY (surah, ayah)
        );
    ",
};

pub const TAFSIR_INDEX: Schema = Schema {
    name: "tafsirs index",
    ddl: "
        CREATE TABLE tafsirs (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            slug            TEXT UNIQUE,
            name            TEXT,
            author          TEXT,
            language        TEXT,
            source          TEXT,
            ayah_count      INTEGER,
            file_size_bytes INTEGER
        );
        CREATE INDEX idx_tafsirs_lang ON tafsirs(language);
    ",
};
