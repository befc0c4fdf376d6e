use log::info;

/// Audio/speech collaborator. Calls are fire-and-forget: the engine never
/// waits on them and never inspects their outcome.
pub trait Narrator {
    fn announce_phoneme(&mut self, text: &str);
    fn announce_creature(&mut self, text: &str);
    fn celebrate(&mut self, score: u32);
}

/// Narrator that says nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNarrator;

impl Narrator for SilentNarrator {
    fn announce_phoneme(&mut self, _text: &str) {}
    fn announce_creature(&mut self, _text: &str) {}
    fn celebrate(&mut self, _score: u32) {}
}

/// Narrator that writes each intent to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNarrator;

impl Narrator for LogNarrator {
    fn announce_phoneme(&mut self, text: &str) {
        info!("narrate: listen for /{text}/");
    }

    fn announce_creature(&mut self, text: &str) {
        info!("narrate: {text}");
    }

    fn celebrate(&mut self, score: u32) {
        info!("narrate: celebrate {score}%");
    }
}
