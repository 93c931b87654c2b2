//! Command vocabulary: name → handler kind, plus the gates and arities
//! attached to each name.

/// Commands answered by the [`crate::engine::adapter::SystemCommandAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemCommand {
    Pwd,
    Ls,
    Cd,
    Cat,
    Ps,
    Netstat,
    Whoami,
    Date,
    Uname,
    Df,
    Free,
    Top,
    Ifconfig,
    Ping,
}

impl SystemCommand {
    pub const ALL: [SystemCommand; 14] = [
        SystemCommand::Pwd,
        SystemCommand::Ls,
        SystemCommand::Cd,
        SystemCommand::Cat,
        SystemCommand::Ps,
        SystemCommand::Netstat,
        SystemCommand::Whoami,
        SystemCommand::Date,
        SystemCommand::Uname,
        SystemCommand::Df,
        SystemCommand::Free,
        SystemCommand::Top,
        SystemCommand::Ifconfig,
        SystemCommand::Ping,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SystemCommand::Pwd => "pwd",
            SystemCommand::Ls => "ls",
            SystemCommand::Cd => "cd",
            SystemCommand::Cat => "cat",
            SystemCommand::Ps => "ps",
            SystemCommand::Netstat => "netstat",
            SystemCommand::Whoami => "whoami",
            SystemCommand::Date => "date",
            SystemCommand::Uname => "uname",
            SystemCommand::Df => "df",
            SystemCommand::Free => "free",
            SystemCommand::Top => "top",
            SystemCommand::Ifconfig => "ifconfig",
            SystemCommand::Ping => "ping",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

/// Commands handled inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameCommand {
    Help,
    Status,
    Quests,
    History,
    NcStatus,
    ClockIn,
    ClockOut,
    DailyTasks,
    CompleteTask,
    DiscoverServices,
    MapNetwork,
    Investigate,
    Decrypt,
    Evidence,
    Tier,
    Specialize,
}

impl GameCommand {
    pub const ALL: [GameCommand; 16] = [
        GameCommand::Help,
        GameCommand::Status,
        GameCommand::Quests,
        GameCommand::History,
        GameCommand::NcStatus,
        GameCommand::ClockIn,
        GameCommand::ClockOut,
        GameCommand::DailyTasks,
        GameCommand::CompleteTask,
        GameCommand::DiscoverServices,
        GameCommand::MapNetwork,
        GameCommand::Investigate,
        GameCommand::Decrypt,
        GameCommand::Evidence,
        GameCommand::Tier,
        GameCommand::Specialize,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GameCommand::Help => "help",
            GameCommand::Status => "status",
            GameCommand::Quests => "quests",
            GameCommand::History => "history",
            GameCommand::NcStatus => "nc-status",
            GameCommand::ClockIn => "nc-clock-in",
            GameCommand::ClockOut => "nc-clock-out",
            GameCommand::DailyTasks => "nc-daily-tasks",
            GameCommand::CompleteTask => "nc-complete-task",
            GameCommand::DiscoverServices => "nc-discover-services",
            GameCommand::MapNetwork => "nc-map-network",
            GameCommand::Investigate => "nc-investigate",
            GameCommand::Decrypt => "nc-decrypt",
            GameCommand::Evidence => "nc-evidence",
            GameCommand::Tier => "nc-tier",
            GameCommand::Specialize => "nc-specialize",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    /// One-line usage shown by `help`.
    pub fn usage(&self) -> &'static str {
        match self {
            GameCommand::Help => "help - this list",
            GameCommand::Status => "status - who you are and how far along",
            GameCommand::Quests => "quests - quest log",
            GameCommand::History => "history - recent commands",
            GameCommand::NcStatus => "nc-status - NetCorp employee record",
            GameCommand::ClockIn => "nc-clock-in - start your shift",
            GameCommand::ClockOut => "nc-clock-out - end your shift",
            GameCommand::DailyTasks => "nc-daily-tasks - today's assignments",
            GameCommand::CompleteTask => "nc-complete-task <n> - mark task n done",
            GameCommand::DiscoverServices => "nc-discover-services - scan for services",
            GameCommand::MapNetwork => "nc-map-network - draw the network map",
            GameCommand::Investigate => "nc-investigate <topic> - dig into a lead",
            GameCommand::Decrypt => "nc-decrypt <n> - decrypt archive file n",
            GameCommand::Evidence => "nc-evidence - collected evidence",
            GameCommand::Tier => "nc-tier - career ladder",
            GameCommand::Specialize => "nc-specialize <track> - choose a specialization",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    PassThrough(SystemCommand),
    Game(GameCommand),
}

/// Duty commands that need an active shift.
pub const SHIFT_GATED: &[&str] = &[
    "nc-daily-tasks",
    "nc-complete-task",
    "nc-discover-services",
    "nc-map-network",
    "nc-investigate",
    "nc-decrypt",
];

/// Commands that do not exist for the player until something unlocks them.
pub const DISCOVERY_GATED: &[&str] = &["nc-map-network", "nc-investigate", "nc-decrypt"];

/// Commands that take exactly one required argument.
const REQUIRES_ARGUMENT: &[(&str, &str)] = &[
    ("cat", "cat: missing file operand"),
    ("ping", "ping: usage error: Destination address required"),
    ("nc-complete-task", "usage: nc-complete-task <task number>"),
    ("nc-investigate", "usage: nc-investigate <topic>"),
    ("nc-decrypt", "usage: nc-decrypt <file number>"),
    ("nc-specialize", "usage: nc-specialize <track>"),
];

/// Name lookup over the fixed vocabulary.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry;

impl CommandRegistry {
    pub fn new() -> Self {
        Self
    }

    pub fn lookup(&self, name: &str) -> Option<CommandKind> {
        if let Some(system) = SystemCommand::from_name(name) {
            return Some(CommandKind::PassThrough(system));
        }
        GameCommand::from_name(name).map(CommandKind::Game)
    }

    pub fn is_shift_gated(&self, name: &str) -> bool {
        SHIFT_GATED.contains(&name)
    }

    pub fn is_discovery_gated(&self, name: &str) -> bool {
        DISCOVERY_GATED.contains(&name)
    }

    /// Usage error when `name` needs an argument and none was given.
    pub fn check_arity(&self, name: &str, args: &[String]) -> Option<&'static str> {
        if !args.is_empty() {
            return None;
        }
        REQUIRES_ARGUMENT
            .iter()
            .find(|(cmd, _)| *cmd == name)
            .map(|(_, usage)| *usage)
    }
}

/// The error text for an unknown (or still undiscovered) command.
pub fn not_found(name: &str) -> String {
    format!("{}: command not found", name)
}
