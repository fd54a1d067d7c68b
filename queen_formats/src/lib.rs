pub mod archive;
pub mod cutaway;
pub mod dialogue;
pub mod logic;
pub mod reader;
pub mod talk_selected;
pub mod verb;
pub mod writer;

pub use archive::{ArchiveEntry, ResourceArchive, build_archive};
pub use cutaway::{
    AnimFrame, AnimType, CutawayBuilder, CutawayScript, CutsceneDirective, DirectiveKind,
    FinalRoom, FrameBank, GameStatePatch, classify,
};
pub use dialogue::{DialogueBuilder, DialogueLevel, DialogueNode, DialogueTree, EndPatch};
pub use logic::{
    Area, AreaToggle, CommandRule, ConditionRule, DescriptionSeries, GameStateOp, GraphicData,
    InventoryPatch, ItemData, LOGIC_FILE_NAME, LogicFile, ObjectData, ObjectPatch, PatchSource,
    SeriesKind, Subject, Toggle,
};
pub use reader::ByteReader;
pub use talk_selected::{TALK_SELECTED_COUNT, TalkSelected, TalkSelectedTable};
pub use verb::{ObjectState, Verb};
pub use writer::ByteWriter;
