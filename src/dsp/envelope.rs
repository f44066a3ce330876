/*
Gate-Driven ADSR
================

The envelope has no note_on/note_off calls: it watches a gate signal and
reacts to its edges, which is what a node inside a compiled graph sees.

  gate        Scalar input. Above 0 means the note is held.

  level       Current output in [0, 1].

  stage       Idle, Attack, Decay, Sustain or Release.


    gate  ____/‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾\______________

  level       /\
             /  \_______________
            /                   \
    0.0 ___/                     \_______________
           A   D       S         R      Idle


Rising edge: Attack from 0, a clean retrigger even mid-release.
Falling edge: Release from wherever the level is, so releasing during the
attack does not click.

Ramps are linear. Attack and decay step by a per-sample increment. Release
snapshots its start level and counts samples so it lands on exactly 0.0,
which is what lets the voice report itself dead.
*/

/// Stages shorter than this are treated as this long.
pub const MIN_TIME: f32 = 0.0005;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl AdsrParams {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack: attack.max(MIN_TIME),
            decay: decay.max(MIN_TIME),
            sustain: sustain.clamp(0.0, 1.0),
            release: release.max(MIN_TIME),
        }
    }
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self::new(0.01, 0.1, 0.7, 0.3)
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    params: AdsrParams,
    stage: EnvelopeState,
    level: f32,
    gate: bool,
    release_start: f32,
    release_total: u32,
    release_elapsed: u32,
}

impl Envelope {
    pub fn new(params: AdsrParams) -> Self {
        Self {
            params,
            stage: EnvelopeState::Idle,
            level: 0.0,
            gate: false,
            release_start: 0.0,
            release_total: 1,
            release_elapsed: 0,
        }
    }

    /// Takes effect from the next sample. A release already under way keeps
    /// the length it started with.
    pub fn set_params(&mut self, params: AdsrParams) {
        self.params = params;
    }

    pub fn params(&self) -> AdsrParams {
        self.params
    }

    /// Advance one sample with the current gate value.
    pub fn next_sample(&mut self, gate: f32, sample_rate: f32) -> f32 {
        let high = gate > 0.0;
        if high && !self.gate {
            self.level = 0.0;
            self.stage = EnvelopeState::Attack;
        } else if !high && self.gate && self.stage != EnvelopeState::Idle {
            self.release_start = self.level;
            self.release_total = (self.params.release * sample_rate).round().max(1.0) as u32;
            self.release_elapsed = 0;
            self.stage = EnvelopeState::Release;
        }
        self.gate = high;

        match self.stage {
            EnvelopeState::Idle => self.level = 0.0,
            EnvelopeState::Attack => {
                self.level += 1.0 / (self.params.attack * sample_rate);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeState::Decay;
                }
            }
            EnvelopeState::Decay => {
                let sustain = self.params.sustain;
                self.level -= (1.0 - sustain) / (self.params.decay * sample_rate);
                if self.level <= sustain {
                    self.level = sustain;
                    self.stage = EnvelopeState::Sustain;
                }
            }
            EnvelopeState::Sustain => self.level = self.params.sustain,
            EnvelopeState::Release => {
                self.release_elapsed = self.release_elapsed.saturating_add(1);
                if self.release_elapsed >= self.release_total {
                    self.level = 0.0;
                    self.stage = EnvelopeState::Idle;
                } else {
                    let progress = self.release_elapsed as f32 / self.release_total as f32;
                    self.level = self.release_start * (1.0 - progress);
                }
            }
        }
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeState::Idle
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(AdsrParams::default())
    }
}
