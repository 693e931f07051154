pub mod state;

pub use state::{
    analyze_state_changes, historical_blocks, BalanceDirection, ContractState, StateAnalysis,
    StateAnalyzer, StateChange, DEFAULT_HISTORY_INTERVALS,
};
