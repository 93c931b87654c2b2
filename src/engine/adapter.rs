//! The boundary to whatever actually answers `ls`, `ps` and friends.
//!
//! The engine never executes real commands. [`SimulatedAdapter`] answers from an
//! in-memory filesystem and canned system output; hosts that want something
//! else implement [`SystemCommandAdapter`] themselves. Whatever the adapter,
//! a failure never reaches the player: the interpreter substitutes
//! [`fallback_output`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::engine::clock::{Clock, SystemClock};
use crate::engine::errors::AdapterError;
use crate::engine::registry::SystemCommand;
use crate::engine::types::ServiceInfo;

pub const DEFAULT_HOSTNAME: &str = "netcorp-ops-07";
pub const DEFAULT_USERNAME: &str = "recruit";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Normal,
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdapterOutput {
    pub output: String,
    pub kind: OutputKind,
}

impl AdapterOutput {
    pub fn normal(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            kind: OutputKind::Normal,
        }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            kind: OutputKind::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == OutputKind::Error
    }
}

#[async_trait]
pub trait SystemCommandAdapter: Send + Sync {
    async fn execute(&self, command: SystemCommand, args: &[String]) -> Result<AdapterOutput, AdapterError>;
    async fn discover_services(&self) -> Result<Vec<ServiceInfo>, AdapterError>;
}

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(String),
}

/// In-memory stand-in for a corporate Linux box.
#[derive(Debug)]
pub struct SimulatedAdapter {
    hostname: String,
    username: String,
    home: String,
    nodes: BTreeMap<String, Node>,
    cwd: Mutex<String>,
    clock: Arc<dyn Clock>,
}

impl Default for SimulatedAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_HOSTNAME, DEFAULT_USERNAME)
    }
}

impl SimulatedAdapter {
    pub fn new(hostname: &str, username: &str) -> Self {
        let home = format!("/home/{}", username);
        let mut nodes = BTreeMap::new();
        for dir in [
            "/",
            "/home",
            home.as_str(),
            "/var",
            "/var/log",
            "/etc",
            "/opt",
            "/opt/aurora",
            "/tmp",
        ] {
            nodes.insert(dir.to_string(), Node::Dir);
        }
        nodes.insert(format!("{}/notes", home), Node::Dir);

        let mut file = |path: String, body: &str| {
            nodes.insert(path, Node::File(body.to_string()));
        };
        file(
            format!("{}/handbook.txt", home),
            "NETCORP EMPLOYEE HANDBOOK (rev. 14)\n\
             1. Clock in before touching production (nc-clock-in).\n\
             2. Your daily assignments are listed by nc-daily-tasks.\n\
             3. Curiosity is encouraged within approved directories.\n\
             4. Do not discuss internal projects outside your team.",
        );
        file(
            format!("{}/admin_note.txt", home),
            "If you are reading this, I am gone. Look at what runs at 03:00.\n\
             Ask about AURORA. The tool nc-investigate still works with my old notes.\n\
             - M.O.",
        );
        file(
            format!("{}/notes/todo.txt", home),
            "- finish onboarding\n- find out why the ops box is slow at night",
        );
        file(
            "/var/log/syslog".to_string(),
            "Mar  2 03:00:01 netcorp-ops-07 CRON[4112]: (aurora) CMD (/opt/aurora/sync --export)\n\
             Mar  2 03:00:02 netcorp-ops-07 aurora-sync[4113]: connecting to 203.0.113.44:8443\n\
             Mar  2 03:14:55 netcorp-ops-07 aurora-sync[4113]: transfer complete (2.1 GB)",
        );
        file(
            "/var/log/auth.log".to_string(),
            "Mar  1 22:41:09 netcorp-ops-07 sshd[3301]: Accepted key for admin from 10.0.4.19\n\
             Mar  1 22:58:30 netcorp-ops-07 usermod[3390]: lock user 'mokafor'",
        );
        file("/etc/hostname".to_string(), hostname);
        file(
            "/etc/passwd".to_string(),
            &format!(
                "root:x:0:0:root:/root:/bin/bash\n\
                 mokafor:x:1001:1001:M. Okafor:/home/mokafor:/usr/sbin/nologin\n\
                 {u}:x:1002:1002:New Recruit:/home/{u}:/bin/bash",
                u = username
            ),
        );
        file(
            "/opt/aurora/README".to_string(),
            "aurora-sync: nightly customer data replication. Owner: facilities.",
        );

        Self {
            hostname: hostname.to_string(),
            username: username.to_string(),
            cwd: Mutex::new(home.clone()),
            home,
            nodes,
            clock: Arc::new(SystemClock),
        }
    }

    /// Answer `date` from `clock` instead of the host's wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn cwd(&self) -> String {
        self.cwd.lock().await.clone()
    }

    fn resolve(&self, cwd: &str, target: &str) -> String {
        let joined = if target == "~" {
            self.home.clone()
        } else if let Some(rest) = target.strip_prefix("~/") {
            format!("{}/{}", self.home, rest)
        } else if target.starts_with('/') {
            target.to_string()
        } else {
            format!("{}/{}", cwd, target)
        };
        let mut parts: Vec<&str> = Vec::new();
        for part in joined.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }
        format!("/{}", parts.join("/"))
    }

    fn children(&self, dir: &str) -> Vec<String> {
        let prefix = if dir == "/" {
            "/".to_string()
        } else {
            format!("{}/", dir)
        };
        self.nodes
            .iter()
            .filter_map(|(path, node)| {
                let rest = path.strip_prefix(&prefix)?;
                if rest.is_empty() || rest.contains('/') {
                    return None;
                }
                Some(match node {
                    Node::Dir => format!("{}/", rest),
                    Node::File(_) => rest.to_string(),
                })
            })
            .collect()
    }

    fn operands(args: &[String]) -> impl Iterator<Item = &String> {
        args.iter().filter(|a| !a.starts_with('-'))
    }

    async fn ls(&self, args: &[String]) -> AdapterOutput {
        let cwd = self.cwd().await;
        let target = Self::operands(args)
            .next()
            .map(|t| self.resolve(&cwd, t))
            .unwrap_or(cwd);
        match self.nodes.get(&target) {
            Some(Node::Dir) => AdapterOutput::normal(self.children(&target).join("  ")),
            Some(Node::File(_)) => {
                AdapterOutput::normal(target.rsplit('/').next().unwrap_or_default().to_string())
            }
            None => AdapterOutput::error(format!(
                "ls: cannot access '{}': No such file or directory",
                target
            )),
        }
    }

    async fn cd(&self, args: &[String]) -> AdapterOutput {
        let mut cwd = self.cwd.lock().await;
        let target = match Self::operands(args).next() {
            Some(t) => self.resolve(&cwd, t),
            None => self.home.clone(),
        };
        match self.nodes.get(&target) {
            Some(Node::Dir) => {
                *cwd = target;
                AdapterOutput::normal("")
            }
            Some(Node::File(_)) => AdapterOutput::error(format!("cd: {}: Not a directory", target)),
            None => AdapterOutput::error(format!("cd: {}: No such file or directory", target)),
        }
    }

    async fn cat(&self, args: &[String]) -> AdapterOutput {
        let cwd = self.cwd().await;
        let mut out = Vec::new();
        for operand in Self::operands(args) {
            let path = self.resolve(&cwd, operand);
            match self.nodes.get(&path) {
                Some(Node::File(body)) => out.push(body.clone()),
                Some(Node::Dir) => return AdapterOutput::error(format!("cat: {}: Is a directory", operand)),
                None => {
                    return AdapterOutput::error(format!(
                        "cat: {}: No such file or directory",
                        operand
                    ))
                }
            }
        }
        AdapterOutput::normal(out.join("\n"))
    }

    fn ps(&self) -> String {
        format!(
            "  PID TTY          TIME CMD\n\
             \x20   1 ?        00:00:04 systemd\n\
             \x20 812 ?        00:00:01 sshd\n\
             \x204113 ?        01:12:40 aurora-sync\n\
             \x205120 pts/0    00:00:00 bash ({})\n\
             \x205188 pts/0    00:00:00 ps",
            self.username
        )
    }

    fn top(&self) -> String {
        "top - load average: 0.42, 0.38, 0.91\n\
         Tasks:  87 total,   1 running,  86 sleeping\n\
         \x20 PID USER      %CPU %MEM COMMAND\n\
         4113 aurora    38.2  6.1 aurora-sync\n\
         \x20 812 root       0.3  0.2 sshd\n\
         \x20   1 root       0.0  0.1 systemd"
            .to_string()
    }

    fn netstat(&self) -> String {
        "Proto Local Address          Foreign Address        State\n\
         tcp   10.0.4.27:22           10.0.4.19:51822        ESTABLISHED\n\
         tcp   10.0.4.27:5432         10.0.4.31:40110        ESTABLISHED\n\
         tcp   10.0.4.27:49210        203.0.113.44:8443      ESTABLISHED"
            .to_string()
    }

    fn ifconfig(&self) -> String {
        "eth0: flags=4163<UP,BROADCAST,RUNNING,MULTICAST>  mtu 1500\n\
         \x20       inet 10.0.4.27  netmask 255.255.255.0  broadcast 10.0.4.255\n\
         lo: flags=73<UP,LOOPBACK,RUNNING>  mtu 65536\n\
         \x20       inet 127.0.0.1  netmask 255.0.0.0"
            .to_string()
    }

    fn df(&self) -> String {
        "Filesystem     Size  Used Avail Use% Mounted on\n\
         /dev/sda1       40G   31G  7.1G  82% /\n\
         /dev/sdb1      500G  471G   29G  95% /opt/aurora"
            .to_string()
    }

    fn free(&self) -> String {
        "              total        used        free\n\
         Mem:          7.7Gi       5.9Gi       1.8Gi\n\
         Swap:         2.0Gi       0.4Gi       1.6Gi"
            .to_string()
    }

    fn uname(&self, args: &[String]) -> String {
        if args.iter().any(|a| a == "-a") {
            format!("Linux {} 5.15.0-netcorp #1 SMP x86_64 GNU/Linux", self.hostname)
        } else {
            "Linux".to_string()
        }
    }

    fn ping(&self, host: &str) -> String {
        let mut out = format!("PING {} 56(84) bytes of data.\n", host);
        for seq in 1..=4 {
            out.push_str(&format!(
                "64 bytes from {}: icmp_seq={} ttl=64 time={}.{} ms\n",
                host,
                seq,
                seq + 2,
                seq * 7 % 10
            ));
        }
        out.push_str(&format!("--- {} ping statistics ---\n4 packets transmitted, 4 received, 0% packet loss", host));
        out
    }
}

#[async_trait]
impl SystemCommandAdapter for SimulatedAdapter {
    async fn execute(&self, command: SystemCommand, args: &[String]) -> Result<AdapterOutput, AdapterError> {
        debug!("simulated {} {:?}", command.name(), args);
        let output = match command {
            SystemCommand::Pwd => AdapterOutput::normal(self.cwd().await),
            SystemCommand::Ls => self.ls(args).await,
            SystemCommand::Cd => self.cd(args).await,
            SystemCommand::Cat => self.cat(args).await,
            SystemCommand::Ps => AdapterOutput::normal(self.ps()),
            SystemCommand::Top => AdapterOutput::normal(self.top()),
            SystemCommand::Netstat => AdapterOutput::normal(self.netstat()),
            SystemCommand::Ifconfig => AdapterOutput::normal(self.ifconfig()),
            SystemCommand::Whoami => AdapterOutput::normal(self.username.clone()),
            SystemCommand::Date => {
                let now = self.clock.now();
                AdapterOutput::normal(now.format("%a %b %e %H:%M:%S UTC %Y").to_string())
            }
            SystemCommand::Uname => AdapterOutput::normal(self.uname(args)),
            SystemCommand::Df => AdapterOutput::normal(self.df()),
            SystemCommand::Free => AdapterOutput::normal(self.free()),
            SystemCommand::Ping => match Self::operands(args).next() {
                Some(host) => AdapterOutput::normal(self.ping(host)),
                None => AdapterOutput::error("ping: usage error: Destination address required"),
            },
        };
        Ok(output)
    }

    async fn discover_services(&self) -> Result<Vec<ServiceInfo>, AdapterError> {
        Ok(default_services())
    }
}

fn service(port: u16, name: &str, status: &str, description: &str) -> ServiceInfo {
    ServiceInfo {
        port,
        name: name.to_string(),
        status: status.to_string(),
        description: description.to_string(),
    }
}

/// The services every simulated sweep reports.
pub fn default_services() -> Vec<ServiceInfo> {
    vec![
        service(22, "ssh", "running", "Remote administration"),
        service(80, "http", "running", "Intranet portal"),
        service(443, "https", "running", "Intranet portal (TLS)"),
        service(5432, "postgres", "running", "Customer records database"),
        service(8443, "aurora-sync", "unlisted", "Outbound replication to 203.0.113.44"),
    ]
}

/// Caller-side deadline around another adapter.
pub struct TimeoutAdapter<A> {
    inner: A,
    timeout: Duration,
}

impl<A: SystemCommandAdapter> TimeoutAdapter<A> {
    pub fn new(inner: A, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

#[async_trait]
impl<A: SystemCommandAdapter> SystemCommandAdapter for TimeoutAdapter<A> {
    async fn execute(&self, command: SystemCommand, args: &[String]) -> Result<AdapterOutput, AdapterError> {
        match tokio::time::timeout(self.timeout, self.inner.execute(command, args)).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::Timeout(self.timeout_ms())),
        }
    }

    async fn discover_services(&self) -> Result<Vec<ServiceInfo>, AdapterError> {
        match tokio::time::timeout(self.timeout, self.inner.discover_services()).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::Timeout(self.timeout_ms())),
        }
    }
}

/// Deterministic stand-in used when the adapter errors. Never an error kind,
/// so a flaky adapter does not stall quests.
pub fn fallback_output(command: SystemCommand, args: &[String]) -> AdapterOutput {
    let target = args.iter().find(|a| !a.starts_with('-')).cloned();
    let text = match command {
        SystemCommand::Pwd => format!("/home/{}", DEFAULT_USERNAME),
        SystemCommand::Ls => "handbook.txt  admin_note.txt  notes/".to_string(),
        SystemCommand::Cd => String::new(),
        SystemCommand::Cat => format!(
            "[cached copy of {}] contents unavailable while the file server is unreachable",
            target.unwrap_or_default()
        ),
        SystemCommand::Whoami => DEFAULT_USERNAME.to_string(),
        SystemCommand::Date => "date: clock source unavailable".to_string(),
        SystemCommand::Uname => "Linux".to_string(),
        SystemCommand::Ping => format!(
            "PING {}: network unreachable from the sandbox, assuming host is up",
            target.unwrap_or_default()
        ),
        SystemCommand::Ps
        | SystemCommand::Top
        | SystemCommand::Netstat
        | SystemCommand::Ifconfig
        | SystemCommand::Df
        | SystemCommand::Free => format!("{}: monitoring agent offline, showing cached summary", command.name()),
    };
    AdapterOutput {
        output: text,
        kind: OutputKind::Info,
    }
}
