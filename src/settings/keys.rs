use crate::model::Stream;

pub const PCM_INPUT: &str = "pcm_input";
pub const PCM_OUTPUT: &str = "pcm_output";
pub const INPUT_USE_SOFTVOL: &str = "input_use_softvol";
pub const OUTPUT_USE_SOFTVOL: &str = "output_use_softvol";
pub const INPUT_USE_DSNOOP: &str = "input_use_dsnoop";
pub const OUTPUT_USE_DMIX: &str = "output_use_dmix";
pub const INPUT_PLUGIN: &str = "input_plugin";
pub const OUTPUT_PLUGIN: &str = "output_plugin";
pub const NUM_OUTPUT_CHANNELS: &str = "num_output_channels";

/// Placeholder pcm for "no card selected"
pub const NULL_PCM: &str = "null";
pub const JACK_PCM: &str = "jack";
pub const DEFAULT_PLUGIN: &str = "hw";
pub const DEFAULT_CHANNELS: u32 = 2;

/// Values written into a freshly created config file
pub fn defaults() -> Vec<(&'static str, String)> {
    vec![
        (PCM_INPUT, NULL_PCM.to_owned()),
        (INPUT_USE_SOFTVOL, true.to_string()),
        (INPUT_USE_DSNOOP, true.to_string()),
        (INPUT_PLUGIN, DEFAULT_PLUGIN.to_owned()),
        (PCM_OUTPUT, NULL_PCM.to_owned()),
        (OUTPUT_USE_SOFTVOL, true.to_string()),
        (OUTPUT_USE_DMIX, true.to_string()),
        (OUTPUT_PLUGIN, DEFAULT_PLUGIN.to_owned()),
        (NUM_OUTPUT_CHANNELS, DEFAULT_CHANNELS.to_string()),
    ]
}

pub fn pcm_key(stream: Stream) -> &'static str {
    match stream {
        Stream::Input => PCM_INPUT,
        Stream::Output => PCM_OUTPUT,
    }
}

pub fn softvol_key(stream: Stream) -> &'static str {
    match stream {
        Stream::Input => INPUT_USE_SOFTVOL,
        Stream::Output => OUTPUT_USE_SOFTVOL,
    }
}

pub fn sharing_key(stream: Stream) -> &'static str {
    match stream {
        Stream::Input => INPUT_USE_DSNOOP,
        Stream::Output => OUTPUT_USE_DMIX,
    }
}

pub fn plugin_key(stream: Stream) -> &'static str {
    match stream {
        Stream::Input => INPUT_PLUGIN,
        Stream::Output => OUTPUT_PLUGIN,
    }
}
