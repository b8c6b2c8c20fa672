//! Chunk scripts and the entry runtime.

use std::sync::LazyLock;

use regex::Regex;
use tote_config::{LibraryConfig, LibraryTarget};

use super::{CHUNK_ARRAY, Syntax, js_string};
use crate::chunk::Chunk;

/// Runtime source. `$BIND` is the binding keyword for values never
/// reassigned and `$FN(params)` a function expression head; both follow
/// `output.environment`. Other `$NAMES` are filled in per entry.
const RUNTIME: &str = r#"var __tote_cache__ = {};
function __tote_require__(id) {
  var cached = __tote_cache__[id];
  if (cached !== undefined) {
    return cached.exports;
  }
  var factory = __tote_modules__[id];
  if (factory === undefined) {
    var error = new Error("Cannot find module '" + id + "'");
    error.code = "MODULE_NOT_FOUND";
    throw error;
  }
  var module = (__tote_cache__[id] = { id: id, exports: {} });
  factory.call(module.exports, module, module.exports, __tote_require__);
  return module.exports;
}
__tote_require__.m = __tote_modules__;
__tote_require__.p = $PUBLIC_PATH;
$BIND __tote_has__ = $FN(object, key) {
  return Object.prototype.hasOwnProperty.call(object, key);
};
__tote_require__.d = $FN(exports, getters) {
  for (var key in getters) {
    if (__tote_has__(getters, key) && !__tote_has__(exports, key)) {
      Object.defineProperty(exports, key, { enumerable: true, get: getters[key] });
    }
  }
};
__tote_require__.o = $FN(exports) {
  Object.defineProperty(exports, "__esModule", { value: true });
};
__tote_require__.i = $FN(mod) {
  if (mod && mod.__esModule) {
    return mod;
  }
  var ns = {};
  if (mod !== null && typeof mod === "object") {
    for (var key in mod) {
      if (key !== "default") {
        ns[key] = mod[key];
      }
    }
  }
  ns["default"] = mod;
  return ns;
};
__tote_require__.a = $FN(exports, source) {
  Object.keys(source).forEach($FN(key) {
    if (key !== "default" && !__tote_has__(exports, key)) {
      Object.defineProperty(exports, key, { enumerable: true, get: $FN() { return source[key]; } });
    }
  });
};
__tote_require__.s = $FN(css, id) {
  if (typeof document === "undefined") {
    return;
  }
  var style = document.createElement("style");
  style.setAttribute("data-tote", id);
  style.appendChild(document.createTextNode(css));
  document.head.appendChild(style);
};
var __tote_installed__ = $INSTALLED;
$BIND __tote_groups__ = $GROUPS;
$BIND __tote_files__ = $FILES;
var __tote_deferred__ = [];
$BIND __tote_load__ = $FN(id) {
  var state = __tote_installed__[id];
  if (state === 0) {
    return Promise.resolve();
  }
  if (state) {
    return state[2];
  }
  var files = __tote_files__[id];
  var promise = new Promise($FN(resolve, reject) {
    state = __tote_installed__[id] = [resolve, reject];
  });
  state[2] = promise;
  if (files[1]) {
    var link = document.createElement("link");
    link.rel = "stylesheet";
    link.href = __tote_require__.p + files[1];
    document.head.appendChild(link);
  }
  var script = document.createElement("script");
  script.src = __tote_require__.p + files[0];
  script.onerror = $FN() {
    var current = __tote_installed__[id];
    if (current !== 0) {
      __tote_installed__[id] = undefined;
      current[1](new Error("Loading chunk " + id + " failed (" + script.src + ")"));
    }
  };
  document.head.appendChild(script);
  return promise;
};
__tote_require__.e = $FN(id) {
  return Promise.all((__tote_groups__[id] || []).map($FN(member) {
    return __tote_load__(member);
  }));
};
$BIND __tote_ready__ = $FN(ids) {
  for (var i = 0; i < ids.length; i++) {
    if (__tote_installed__[ids[i]] !== 0) {
      return false;
    }
  }
  return true;
};
$BIND __tote_flush__ = $FN() {
  for (var i = 0; i < __tote_deferred__.length; i++) {
    var job = __tote_deferred__[i];
    if (__tote_ready__(job[0])) {
      __tote_deferred__.splice(i--, 1);
      job[1]();
    }
  }
};
__tote_require__.x = $FN(ids, run) {
  if (__tote_ready__(ids)) {
    return run();
  }
  __tote_deferred__.push([ids, run]);
};
$BIND __tote_push__ = $FN(data) {
  var ids = data[0];
  var modules = data[1];
  for (var key in modules) {
    if (__tote_has__(modules, key)) {
      __tote_modules__[key] = modules[key];
    }
  }
  for (var i = 0; i < ids.length; i++) {
    var state = __tote_installed__[ids[i]];
    __tote_installed__[ids[i]] = 0;
    if (state) {
      state[0]();
    }
  }
  __tote_flush__();
};
var __tote_root__ = typeof self !== "undefined" ? self : this;
var __tote_queue__ = (__tote_root__[$ARRAY] = __tote_root__[$ARRAY] || []);
__tote_queue__.forEach($FN(data) {
  __tote_push__(data);
});
var __tote_parent_push__ = __tote_queue__.push.bind(__tote_queue__);
__tote_queue__.push = $FN(data) {
  __tote_parent_push__(data);
  __tote_push__(data);
};
"#;

static FN_HEAD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$FN\(([^)]*)\)").expect("static regex"));

/// Files of one chunk, relative to the public path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFiles {
    pub js: String,
    pub css: Option<String>,
}

/// What an entry chunk's runtime needs beyond its own modules.
#[derive(Debug, Clone)]
pub struct EntryRuntime<'a> {
    pub chunk: &'a Chunk,
    /// Module keys to run, in order.
    pub roots: Vec<String>,
    /// Names of the chunks in the entry's group other than itself.
    pub initial: Vec<String>,
    /// Async chunk name → names of the chunks its `import()` loads.
    pub groups: Vec<(String, Vec<String>)>,
    /// Chunk name → files, for every chunk some group may load.
    pub files: Vec<(String, ChunkFiles)>,
    pub public_path: &'a str,
    pub library: Option<&'a LibraryConfig>,
}

/// Script for an entry chunk: factories, runtime and startup.
pub fn render_entry_script(entry: &EntryRuntime<'_>, factories: &[String], syntax: Syntax) -> String {
    let groups = js_object(entry.groups.iter().map(|(name, members)| {
        let members: Vec<String> = members.iter().map(|m| js_string(m)).collect();
        (name.as_str(), format!("[{}]", members.join(", ")))
    }));
    let files = js_object(entry.files.iter().map(|(name, files)| {
        let css = files
            .css
            .as_deref()
            .map(js_string)
            .unwrap_or_else(|| "null".to_string());
        (name.as_str(), format!("[{}, {css}]", js_string(&files.js)))
    }));
    let installed = js_object(std::iter::once((entry.chunk.name.as_str(), "0".to_string())));

    let runtime = RUNTIME
        .replace("$BIND", syntax.binding())
        .replace("$PUBLIC_PATH", &js_string(entry.public_path))
        .replace("$INSTALLED", &installed)
        .replace("$GROUPS", &groups)
        .replace("$FILES", &files)
        .replace("$ARRAY", &js_string(CHUNK_ARRAY));
    let runtime = expand_functions(&runtime, syntax);

    let initial: Vec<String> = entry.initial.iter().map(|name| js_string(name)).collect();
    let mut startup = String::new();
    for (index, root) in entry.roots.iter().enumerate() {
        let call = format!("__tote_require__({})", js_string(root));
        if index + 1 == entry.roots.len() {
            startup.push_str(&format!("  return {call};\n"));
        } else {
            startup.push_str(&format!("  {call};\n"));
        }
    }

    let body = format!(
        "var __tote_modules__ = {{\n{}\n}};\n{runtime}return __tote_require__.x([{}], {} {{\n{startup}}});",
        factories.join(",\n"),
        initial.join(", "),
        syntax.function(""),
    );
    let iife = format!("(function () {{\n{body}\n}})()");

    match entry.library {
        Some(library) => {
            let name = library.name.replace("[name]", &entry.chunk.name);
            let lhs = match library.target {
                LibraryTarget::Var => format!("var {name}"),
                LibraryTarget::Window => format!("window[{}]", js_string(&name)),
                LibraryTarget::Global => format!("global[{}]", js_string(&name)),
                LibraryTarget::SelfTarget => format!("self[{}]", js_string(&name)),
                LibraryTarget::Commonjs => "module.exports".to_string(),
            };
            format!("{lhs} = {iife};\n")
        }
        None => format!("{iife};\n"),
    }
}

/// Script for an async or split chunk: registers its factories.
pub fn render_chunk_script(chunk: &Chunk, factories: &[String]) -> String {
    let array = js_string(CHUNK_ARRAY);
    format!(
        "(function (root) {{\n(root[{array}] = root[{array}] || []).push([[{}], {{\n{}\n}}]);\n}})(typeof self !== \"undefined\" ? self : this);\n",
        js_string(&chunk.name),
        factories.join(",\n"),
    )
}

fn expand_functions(source: &str, syntax: Syntax) -> String {
    FN_HEAD
        .replace_all(source, |caps: &regex::Captures<'_>| syntax.function(&caps[1]))
        .into_owned()
}

fn js_object<'a>(entries: impl Iterator<Item = (&'a str, String)>) -> String {
    let fields: Vec<String> = entries
        .map(|(key, value)| format!("{}: {value}", js_string(key)))
        .collect();
    if fields.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", fields.join(", "))
    }
}
