use std::{
    fs::File,
    io::BufReader,
    path::Path,
};

use color_eyre::eyre::{
    bail,
    eyre,
};
use hellschreiber::{
    FontTable,
    TransmissionAssembler,
    audio::{
        AudioSink,
        OutputBackend,
        RodioBackend,
        SampleFormat,
        WavBackend,
        WriteModePolicy,
    },
    convert::{
        bdf::{
            self,
            BdfOptions,
        },
        cxx::{
            self,
            RowStreamOptions,
        },
        export,
    },
    ptt,
};

use crate::{
    Error,
    args::{
        ConvertCommand,
        FontArgs,
    },
    files::Settings,
};

pub fn render(
    settings: &Settings,
    text: &str,
    output: &Path,
    format: SampleFormat,
    fonts: &FontArgs,
    volume: Option<f32>,
    no_markers: bool,
) -> Result<(), Error> {
    let config = &settings.hell;
    let assembler = TransmissionAssembler::new(settings.font_set(fonts)?, &config.modem)?;
    let text = if no_markers {
        text.to_owned()
    }
    else {
        assembler.wrap_markers(text)
    };
    let job = assembler.assemble(&text);

    let mut backend = WavBackend::new(output);
    for rejected in SampleFormat::NEGOTIATION_ORDER {
        if rejected != format {
            backend = backend.reject_format(rejected);
        }
    }

    let policy = WriteModePolicy::from_config(&config.sound, config.modem.samples_per_pixel());
    let sink = AudioSink::new(backend, policy, job.sample_rate());
    sink.write_buffers(job.buffers(), volume.unwrap_or(config.sound.volume_db))?;
    sink.close();

    println!(
        "{}: {} characters, {:.2} s",
        output.display(),
        job.num_characters(),
        job.duration().as_secs_f32()
    );
    Ok(())
}

pub fn devices(settings: &Settings) -> Result<(), Error> {
    let backend = RodioBackend;
    let policy = WriteModePolicy::from_config(
        &settings.hell.sound,
        settings.hell.modem.samples_per_pixel(),
    );

    let default_device = backend
        .default_output_device()
        .map_err(|error| eyre!("{error}"))?;
    let devices = backend
        .output_devices()
        .map_err(|error| eyre!("{error}"))?;

    if devices.is_empty() {
        bail!("No output devices found");
    }

    for device in devices {
        let marker = if default_device.as_ref() == Some(&device) {
            "*"
        }
        else {
            " "
        };
        println!("{marker} {device}: {:?}", policy.write_mode(&device));
    }
    Ok(())
}

pub fn ports() -> Result<(), Error> {
    let ports = ptt::available_ports().map_err(|error| eyre!("{error}"))?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

pub fn show(settings: &Settings, table: &Path, characters: &str) -> Result<(), Error> {
    let table = FontTable::from_path(table, None)?;
    let height = settings.hell.modem.pixel_height;

    for character in characters.chars() {
        match table.get(character) {
            Some(glyph) => {
                println!("{character:?} (U+{:04X})", u32::from(character));
                print!("{}", glyph.display(height));
            }
            None => println!("{character:?} (U+{:04X}): no glyph", u32::from(character)),
        }
    }
    Ok(())
}

pub fn convert(command: ConvertCommand) -> Result<(), Error> {
    let (table, output) = match command {
        ConvertCommand::Bdf { input, output } => {
            let glyphs = bdf::parse(BufReader::new(File::open(&input)?))?;
            (bdf::to_table(&glyphs, &BdfOptions::default())?, output)
        }
        ConvertCommand::Cxx { input, output } => {
            let entries = cxx::parse_entries(&std::fs::read_to_string(&input)?)?;
            (cxx::entries_to_table(entries)?, output)
        }
        ConvertCommand::Export { table, output } => {
            let table = FontTable::from_path(&table, None)?;
            export::to_typescript_path(&table, &output)?;
            println!("{}: {} glyphs", output.display(), table.len());
            return Ok(());
        }
        ConvertCommand::Rows {
            input,
            output,
            start,
            rows,
            cols,
        } => {
            let options = RowStreamOptions { rows, cols, start };
            let table = cxx::parse_row_stream(&std::fs::read_to_string(&input)?, &options)?;
            (table, output)
        }
    };

    table.to_path(&output)?;
    println!(
        "{}: {} glyphs, width {}",
        output.display(),
        table.len(),
        table.width()
    );
    Ok(())
}
