use thiserror::Error;
use yieldshare_types::RewardError;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("config error: {0}")]
    Config(String),

    #[error("state error: {0}")]
    State(String),

    #[error(transparent)]
    Reward(#[from] RewardError),
}
