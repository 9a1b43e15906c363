//! Console command parsing.

use claim_land::{Aabb, BlockPos, EntityId, LandFlags, LandId, PlayerId, SubLandId};

/// Commands that can be sent from the input thread
#[derive(Debug, PartialEq)]
pub enum Command {
    Claim {
        owner: PlayerId,
        dimension: String,
        bounds: Aabb,
        name: String,
    },
    Public {
        dimension: String,
        bounds: Aabb,
        name: String,
    },
    Delete(LandId),
    Sub {
        parent: LandId,
        owner: PlayerId,
        bounds: Aabb,
        name: String,
    },
    Resize {
        sub: SubLandId,
        bounds: Aabb,
    },
    DeleteSub(SubLandId),
    Share {
        land: LandId,
        player: PlayerId,
    },
    Flag {
        land: LandId,
        flag: LandFlags,
        enabled: bool,
    },
    At {
        dimension: String,
        x: i32,
        z: i32,
        y: Option<i32>,
    },
    List(Option<PlayerId>),
    Join(EntityId),
    Leave(EntityId),
    Move {
        entity: EntityId,
        dimension: String,
        pos: BlockPos,
    },
    Reindex,
    Audit,
    Quit,
    Help,
    Invalid(String),
    Unknown(String),
}

pub const HELP: &[&str] = &[
    "claim <owner> <dim> <x1> <y1> <z1> <x2> <y2> <z2> [name]",
    "public <dim> <x1> <y1> <z1> <x2> <y2> <z2> [name]",
    "delete <land>",
    "sub <land> <owner> <x1> <y1> <z1> <x2> <y2> <z2> [name]",
    "resize <sub> <x1> <y1> <z1> <x2> <y2> <z2>",
    "unsub <sub>",
    "share <land> <player>",
    "flag <land> <FLAG_NAME> on|off",
    "at <dim> <x> <z> [y]",
    "list [owner]",
    "join <entity> | leave <entity> | move <entity> <dim> <x> <y> <z>",
    "reindex | audit | help | quit",
];

struct Args<'a> {
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn word(&mut self, what: &str) -> Result<&'a str, String> {
        self.words.next().ok_or_else(|| format!("missing {what}"))
    }

    fn int(&mut self, what: &str) -> Result<i32, String> {
        let word = self.word(what)?;
        word.parse().map_err(|_| format!("{what} must be an integer, got '{word}'"))
    }

    fn id(&mut self, what: &str) -> Result<u64, String> {
        let word = self.word(what)?;
        word.parse().map_err(|_| format!("{what} must be an id, got '{word}'"))
    }

    fn pos(&mut self) -> Result<BlockPos, String> {
        Ok(BlockPos::new(self.int("x")?, self.int("y")?, self.int("z")?))
    }

    fn bounds(&mut self) -> Result<Aabb, String> {
        Ok(Aabb::from_corners(self.pos()?, self.pos()?))
    }

    /// Everything left, joined by single spaces.
    fn rest(self) -> String {
        self.words.collect::<Vec<_>>().join(" ")
    }

    fn optional_int(&mut self, what: &str) -> Result<Option<i32>, String> {
        match self.words.next() {
            None => Ok(None),
            Some(word) => word
                .parse()
                .map(Some)
                .map_err(|_| format!("{what} must be an integer, got '{word}'")),
        }
    }
}

pub fn parse_command(input: &str) -> Command {
    let mut words = input.split_whitespace();
    let Some(head) = words.next() else {
        return Command::Unknown(String::new());
    };
    let head = head.to_lowercase();
    let args = Args { words };

    match parse_args(&head, args) {
        Ok(Some(cmd)) => cmd,
        Ok(None) => Command::Unknown(head),
        Err(msg) => Command::Invalid(format!("{head}: {msg}")),
    }
}

fn parse_args(head: &str, mut args: Args<'_>) -> Result<Option<Command>, String> {
    let cmd = match head {
        "claim" => Command::Claim {
            owner: PlayerId::new(args.word("owner")?),
            dimension: args.word("dimension")?.to_owned(),
            bounds: args.bounds()?,
            name: args.rest(),
        },
        "public" => Command::Public {
            dimension: args.word("dimension")?.to_owned(),
            bounds: args.bounds()?,
            name: args.rest(),
        },
        "delete" => Command::Delete(LandId(args.id("land")?)),
        "sub" => Command::Sub {
            parent: LandId(args.id("land")?),
            owner: PlayerId::new(args.word("owner")?),
            bounds: args.bounds()?,
            name: args.rest(),
        },
        "resize" => Command::Resize {
            sub: SubLandId(args.id("sub-land")?),
            bounds: args.bounds()?,
        },
        "unsub" => Command::DeleteSub(SubLandId(args.id("sub-land")?)),
        "share" => Command::Share {
            land: LandId(args.id("land")?),
            player: PlayerId::new(args.word("player")?),
        },
        "flag" => {
            let land = LandId(args.id("land")?);
            let name = args.word("flag")?.to_uppercase();
            let flag = LandFlags::from_name(&name).ok_or_else(|| format!("unknown flag {name}"))?;
            let enabled = match args.word("on|off")? {
                "on" | "true" => true,
                "off" | "false" => false,
                other => return Err(format!("expected on or off, got '{other}'")),
            };
            Command::Flag { land, flag, enabled }
        }
        "at" => Command::At {
            dimension: args.word("dimension")?.to_owned(),
            x: args.int("x")?,
            z: args.int("z")?,
            y: args.optional_int("y")?,
        },
        "list" | "l" => {
            let owner = args.rest();
            Command::List((!owner.is_empty()).then(|| PlayerId::new(owner)))
        }
        "join" => Command::Join(EntityId(args.id("entity")?)),
        "leave" => Command::Leave(EntityId(args.id("entity")?)),
        "move" => Command::Move {
            entity: EntityId(args.id("entity")?),
            dimension: args.word("dimension")?.to_owned(),
            pos: args.pos()?,
        },
        "reindex" | "r" => Command::Reindex,
        "audit" => Command::Audit,
        "q" | "quit" | "exit" => Command::Quit,
        "help" | "h" | "?" => Command::Help,
        _ => return Ok(None),
    };
    Ok(Some(cmd))
}
