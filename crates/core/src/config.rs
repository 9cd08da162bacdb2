use plain_agent_model::ModelOptions;

const DEFAULT_MODEL_ID: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1500;
const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Configuration of an [`Agent`](crate::Agent).
///
/// The configuration is read-only once it's handed to the agent.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentConfig {
    model_id: String,
    temperature: f32,
    max_output_tokens: u32,
    max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl AgentConfig {
    /// Sets the model to sample from.
    #[inline]
    pub fn with_model_id<S: Into<String>>(mut self, model_id: S) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the upper bound of tokens for one model response.
    #[inline]
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Sets how many times the model may be called while answering one
    /// user input.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Returns the model identifier.
    #[inline]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Returns the sampling temperature.
    #[inline]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Returns the upper bound of tokens for one model response.
    #[inline]
    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    /// Returns the model call budget of one user input.
    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub(crate) fn model_options(&self) -> ModelOptions {
        ModelOptions {
            model: self.model_id.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}
