use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::value::{Cell, FrameId, ProcId, Procedure};

/// One level of the environment: a name-to-cell mapping plus a link to the
/// enclosing frame. The frame with no outer link is the global frame.
pub struct Frame {
    vars: HashMap<String, Cell>,
    outer: Option<FrameId>,
}

/// The two append-only pools owned by an interpreter session.
///
/// Procedures and frames are addressed by stable indices and never
/// reclaimed: a closure's captured frame and a frame's outer link are
/// non-owning references into the pools, and many procedures may share one
/// frame. The referent graph is cyclic (a frame can name procedures that
/// captured that frame), which is why handles rather than ownership.
pub struct Pools {
    procs: Vec<Procedure>,
    frames: Vec<Frame>,
    proc_capacity: usize,
    frame_capacity: usize,
}

impl Pools {
    /// Create the pools with the global frame pre-allocated at index 0.
    pub fn new(proc_capacity: usize, frame_capacity: usize) -> Self {
        let mut frames = Vec::with_capacity(frame_capacity.min(1024));
        frames.push(Frame {
            vars: HashMap::new(),
            outer: None,
        });
        Pools {
            procs: Vec::new(),
            frames,
            proc_capacity,
            frame_capacity,
        }
    }

    /// The global frame.
    pub fn global(&self) -> FrameId {
        FrameId(0)
    }

    /// Allocate a procedure. Returns a ProcId.
    pub fn alloc_proc(&mut self, proc: Procedure) -> Result<ProcId> {
        if self.procs.len() >= self.proc_capacity {
            return Err(Error::PoolOverflow("procedure"));
        }
        let id = ProcId(self.procs.len() as u32);
        self.procs.push(proc);
        Ok(id)
    }

    #[inline]
    pub fn proc(&self, id: ProcId) -> &Procedure {
        &self.procs[id.0 as usize]
    }

    /// Allocate an empty frame chained to `outer`.
    pub fn alloc_frame(&mut self, outer: FrameId) -> Result<FrameId> {
        if self.frames.len() >= self.frame_capacity {
            return Err(Error::PoolOverflow("frame"));
        }
        let id = FrameId(self.frames.len() as u32);
        self.frames.push(Frame {
            vars: HashMap::new(),
            outer: Some(outer),
        });
        Ok(id)
    }

    /// Look a name up, walking frames outward to the global frame.
    pub fn lookup(&self, frame: FrameId, name: &str) -> Result<Cell> {
        let mut current = Some(frame);
        while let Some(id) = current {
            let f = &self.frames[id.0 as usize];
            if let Some(cell) = f.vars.get(name) {
                return Ok(cell.clone());
            }
            current = f.outer;
        }
        Err(Error::Unbound(name.to_string()))
    }

    /// Bind or overwrite a name in `frame` itself, shadowing any binding
    /// of the same name in an enclosing frame.
    pub fn assign(&mut self, frame: FrameId, name: &str, value: Cell) {
        self.frames[frame.0 as usize]
            .vars
            .insert(name.to_string(), value);
    }

    /// Build the application frame for a procedure call: a fresh frame
    /// chained to `outer` with parameters bound to arguments positionally,
    /// one parameter per argument.
    pub fn bind(&mut self, params: &[Cell], args: Vec<Cell>, outer: FrameId) -> Result<FrameId> {
        if params.len() != args.len() {
            return Err(Error::ArityMismatch {
                expected: params.len(),
                got: args.len(),
            });
        }
        let frame = self.alloc_frame(outer)?;
        for (param, arg) in params.iter().zip(args) {
            let name = param.as_name()?;
            self.assign(frame, name, arg);
        }
        Ok(frame)
    }

    /// Number of procedures allocated so far.
    pub fn proc_count(&self) -> usize {
        self.procs.len()
    }

    /// Number of frames allocated so far (the global frame included).
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}
