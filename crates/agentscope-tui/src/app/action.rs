/// All possible actions in the application (command pattern)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    ToggleHelp,

    // Stream control
    TogglePause,
    Reconnect,
    ClearLogs,
    ExportLogs,

    // Search/Filter input
    OpenSearch,
    CloseSearch,
    SearchInput(char),
    SearchBackspace,
    SearchClear,
    ApplyFilter,

    // Filter in log viewer
    ClearFilter,
    ToggleRegex,
    CycleLevel,
    CycleStatus,
    CycleAgent,

    // Scrolling (row 0 is the newest entry)
    ScrollUp(usize),
    ScrollDown(usize),
    PageUp,
    PageDown,
    ScrollToTop,
    ScrollToBottom,

    // Display toggles
    ToggleFollow,
    ToggleTimestamps,
    ToggleStats,

    // Status line
    ShowMessage(String),
    DismissMessage,

    // Render request
    Render,
}
