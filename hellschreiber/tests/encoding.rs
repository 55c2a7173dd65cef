use approx::assert_relative_eq;
use hellschreiber::{
    FontSet,
    FontTable,
    Glyph,
    TransmissionAssembler,
    audio::{
        AudioSink,
        WavBackend,
        WriteModePolicy,
    },
    config::{
        ModemConfig,
        SoundConfig,
    },
    convert::cxx,
    font::{
        Lookup,
        TableKind,
    },
    modem::CharacterEncoder,
    testing::MockOutput,
};

const L: usize = 14 * 14 * 194;

fn sos_fonts() -> FontSet {
    let table = FontTable::from_entries(
        14,
        [
            ('S', vec![0x0c38, 0x1e7c, 0x3666, 0x3666, 0x3e6c, 0x1c48, 0]),
            ('O', vec![0x0ff0, 0x1ff8, 0x300c, 0x300c, 0x1ff8, 0x0ff0, 0]),
        ],
    )
    .unwrap();
    FontSet::new(14).unwrap().with_primary(table).unwrap()
}

#[test]
fn sos_is_three_characters_back_to_back() {
    let assembler = TransmissionAssembler::new(sos_fonts(), &ModemConfig::default()).unwrap();
    let job = assembler.assemble("SOS");

    assert_eq!(job.concatenated().len(), 3 * L);
    assert_eq!(job.schedule(), &[L, 2 * L, 3 * L]);
    assert_eq!(job.buffers()[0], job.buffers()[2]);
    assert_ne!(job.buffers()[0], job.buffers()[1]);
}

#[test]
fn gap_between_two_characters() {
    let config = ModemConfig {
        gap_ms: 25.0,
        ..Default::default()
    };
    let assembler = TransmissionAssembler::new(sos_fonts(), &config).unwrap();
    let job = assembler.assemble("AB");

    assert_eq!(job.buffers().len(), 3);
    assert_eq!(job.schedule().len(), 2);
    let total: usize = job.buffers().iter().map(Vec::len).sum();
    assert_eq!(job.schedule()[1], total);
    assert_eq!(job.buffers()[1].len(), 1200);
}

#[test]
fn short_glyphs_sound_like_zero_padded_ones() {
    let encoder = CharacterEncoder::from_config(&ModemConfig::default()).unwrap();

    for columns in [vec![0x3fff], vec![0x1, 0x2, 0x4], vec![0x2aaa; 13]] {
        let short = Glyph::new(columns.iter().copied(), columns.len());
        let mut padded_columns = columns.clone();
        padded_columns.resize(14, 0);
        let padded = Glyph::new(padded_columns, 14);

        assert_eq!(encoder.encode(&short), encoder.encode(&padded));
    }
}

#[test]
fn encoded_length_is_fixed() {
    let encoder = CharacterEncoder::from_config(&ModemConfig::default()).unwrap();

    // xorshift, so the patterns are arbitrary but repeatable
    let mut state = 0x2545_f491u32;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };

    for width in 0..20 {
        let glyph = Glyph::new((0..width).map(|_| next()), width);
        assert_eq!(encoder.encode(&glyph).len(), L);
    }
}

#[test]
fn ascii_lookup_tries_case_variants_before_secondary_table() {
    let primary = FontTable::from_entries(14, [('a', vec![1])]).unwrap();
    let secondary = FontTable::from_entries(14, [('A', vec![2])]).unwrap();
    let fonts = FontSet::new(14)
        .unwrap()
        .with_primary(primary)
        .unwrap()
        .with_secondary(secondary)
        .unwrap();

    match fonts.lookup('A') {
        Lookup::Found { glyph, table, .. } => {
            assert_eq!(table, TableKind::Primary);
            assert_eq!(glyph.column(0), 1);
        }
        Lookup::Blank => panic!("'A' should resolve to the primary 'a'"),
    }
}

#[test]
fn volume_scales_by_decibels() {
    let ones = vec![1.0f32; 64];

    let reference = MockOutput::new();
    AudioSink::new(reference.clone(), policy(), 48_000)
        .write(&ones, 0.0)
        .unwrap();

    for volume_db in [-60.0f32, -20.0, -6.0, -0.5] {
        let output = MockOutput::new();
        AudioSink::new(output.clone(), policy(), 48_000)
            .write(&ones, volume_db)
            .unwrap();

        let factor = 10f32.powf(volume_db / 20.0);
        for (scaled, unscaled) in output.written_f32().iter().zip(reference.written_f32()) {
            assert_relative_eq!(*scaled, unscaled * factor, max_relative = 1e-5);
        }
    }
}

fn policy() -> WriteModePolicy {
    WriteModePolicy::from_config(&SoundConfig::default(), 194)
}

#[test]
fn converted_table_survives_reload() {
    let source = r#"
    static fntchr feldfat[] = {
        { 'A', { 0x0ffc, 0x1ffe, 0x3183, 0x3183, 0x1ffe, 0x0ffc, 0x0000 } },
        { 'B', { 0x3fff, 0x3fff, 0x3183, 0x3183, 0x1ffe, 0x0e7c, 0x0000 } },
        { 92, { 0x0003, 0x000c, 0x0030, 0x00c0, 0x0300, 0x0c00, 0x3000 } },
    };
    "#;
    let table = cxx::entries_to_table(cxx::parse_entries(source).unwrap()).unwrap();

    let mut json = vec![];
    table.to_writer(&mut json).unwrap();
    let reloaded = FontTable::from_reader(json.as_slice(), None).unwrap();

    assert_eq!(reloaded.len(), 3);
    for (character, glyph) in table.iter() {
        assert_eq!(reloaded.get(character).unwrap().columns(), glyph.columns());
    }
    assert_eq!(reloaded.get('\\').unwrap().column(6), 0x3000);
}

#[test]
fn renders_to_wav() {
    let path = std::env::temp_dir().join("hellschreiber-renders-to-wav.wav");
    let assembler = TransmissionAssembler::new(sos_fonts(), &ModemConfig::default()).unwrap();
    let job = assembler.assemble("SOS");

    let sink = AudioSink::new(WavBackend::new(&path), policy(), job.sample_rate());
    sink.write_buffers(job.buffers(), -20.0).unwrap();
    sink.close();

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 48_000);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.len() as usize, 3 * L);

    let _ = std::fs::remove_file(path);
}
