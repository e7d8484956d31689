//! Criterion benchmarks for the typed accessor path.
//!
//! Every `get`/`set` opens a fresh store handle and re-decodes the value;
//! these benches keep an eye on what that costs against the in-memory
//! backend.
//!
//! Run with:
//! ```bash
//! cargo bench --package hivebind-core --bench setting_bench
//! ```

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hivebind_core::{
    settings_ordinal, settings_schema, MemoryStore, RawValue, RootKey, Schema, SchemaLocation,
    SettingValue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Off,
    Error,
    Warn,
    Info,
}

settings_ordinal!(Level {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
});

settings_schema! {
    struct BenchSettings {
        level: Level = "logLevel",
        dir: String = "logDir",
    }
}

const LOC: SchemaLocation = SchemaLocation::new(RootKey::LocalMachine, r"Software\Vendor\Bench");

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.bench_function("encode_level", |b| b.iter(|| black_box(Level::Warn).encode()));
    group.bench_function("decode_level_ordinal", |b| {
        b.iter(|| Level::decode(black_box(RawValue::Dword(2))))
    });
    group.bench_function("decode_level_token", |b| {
        b.iter(|| Level::decode(black_box(RawValue::String("info".into()))))
    });
    group.finish();
}

fn bench_accessors(c: &mut Criterion) {
    let settings = BenchSettings::new(Schema::new(LOC, Arc::new(MemoryStore::new())));
    settings.level().set(&Level::Info).expect("seed level");
    settings.dir().set(&"logs".to_string()).expect("seed dir");

    let mut group = c.benchmark_group("accessor");
    group.bench_function("get_level", |b| b.iter(|| settings.level().get()));
    group.bench_function("set_level", |b| {
        b.iter(|| settings.level().set(black_box(&Level::Error)))
    });
    group.bench_function("get_dir", |b| b.iter(|| settings.dir().get()));
    group.bench_function("get_or_default_missing", |b| {
        let missing = settings.schema_missing_leaf();
        b.iter(|| missing.get_or_default(Level::Off))
    });
    group.finish();
}

impl BenchSettings {
    fn schema_missing_leaf(&self) -> hivebind_core::Setting<'_, Level> {
        use hivebind_core::SettingsSchema;
        hivebind_core::Setting::new(self.schema(), "neverWritten")
    }
}

criterion_group!(benches, bench_codec, bench_accessors);
criterion_main!(benches);
