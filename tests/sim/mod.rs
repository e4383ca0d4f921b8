use rpld::time::*;

mod message;
mod node;

pub use message::Message;
pub use node::{Node, IFINDEX};

/// A root seed advertising `2001:db8::/64` in instance 1.
pub const ROOT_SEED: &str = r#"
[[ifaces]]
ifname = "lowpan0"
dodag_root = true

[[ifaces.rpls]]
instance = 1

[[ifaces.rpls.dags]]
dest_prefix = "2001:db8::/64"
"#;

/// Rounds of delivery allowed within a single instant.
const MAX_ROUNDS: usize = 64;

/// Build a chain `0 - 1 - ... - len-1` rooted at node 0.
pub fn chain(len: usize) -> NetworkSim {
    let mut sim = NetworkSim::new();
    sim.create_node(ROOT_SEED);
    for id in 1..len {
        sim.create_node("");
        sim.link(id - 1, id);
    }
    sim
}

/// Nodes sharing links; every message is delivered instantly.
#[derive(Debug)]
pub struct NetworkSim {
    pub nodes: Vec<Node>,
    pub messages: Vec<Message>,
    pub now: Instant,
    started: bool,
}

impl Default for NetworkSim {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkSim {
    /// Create a new network simulation.
    pub fn new() -> Self {
        Self {
            nodes: vec![],
            messages: vec![],
            now: Instant::ZERO,
            started: false,
        }
    }

    /// Create a new node from a seed document.
    pub fn create_node(&mut self, seed: &str) -> &mut Node {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id, seed));
        &mut self.nodes[id]
    }

    /// Put nodes `a` and `b` in range of each other.
    pub fn link(&mut self, a: usize, b: usize) {
        self.nodes[a].neighbors.push(b);
        self.nodes[b].neighbors.push(a);
    }

    pub fn msgs(&self) -> &[Message] {
        &self.messages
    }

    /// Run the simulation for `duration`, jumping from one timer to the next.
    pub fn run(&mut self, duration: Duration) {
        if !self.started {
            for node in &mut self.nodes {
                node.daemon.start(self.now);
            }
            self.started = true;
        }

        let end = self.now + duration;
        loop {
            for node in self.nodes.iter_mut().filter(|n| n.enabled) {
                node.daemon.poll(self.now);
            }
            self.settle();

            let next = self
                .nodes
                .iter()
                .filter(|n| n.enabled)
                .filter_map(|n| n.daemon.poll_at())
                .min();
            match next {
                Some(at) if at <= end => {
                    self.now = if at > self.now {
                        at
                    } else {
                        self.now + Duration::from_millis(1)
                    };
                }
                _ => {
                    self.now = end;
                    return;
                }
            }
        }
    }

    /// Deliver messages until nobody has anything left to say.
    pub fn settle(&mut self) {
        for _ in 0..MAX_ROUNDS {
            let now = self.now;
            let mut outgoing = vec![];
            for node in self.nodes.iter_mut().filter(|n| n.enabled) {
                outgoing.extend(node.outgoing(now));
            }
            if outgoing.is_empty() {
                return;
            }

            for msg in &outgoing {
                let neighbors = self.nodes[msg.from].neighbors.clone();
                for id in neighbors {
                    let node = &mut self.nodes[id];
                    if node.enabled && (msg.is_broadcast() || node.ll == msg.dst) {
                        node.receive_message(msg);
                    }
                }
            }
            self.messages.extend(outgoing);

            for node in self.nodes.iter_mut().filter(|n| n.enabled) {
                node.process(now);
            }
        }
        panic!("messages still in flight after {} rounds", MAX_ROUNDS);
    }
}
